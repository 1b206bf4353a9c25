// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The telemetry source: native counter with per-call synthetic fallback.

use crate::config::TelemetryConfig;
use crate::tracker::AllocationTracker;
use lodgov_core::{NativeCounter, TelemetryMode, TelemetryReading};
use std::sync::Arc;

/// Produces free-memory readings on demand.
///
/// The persistent [`TelemetryMode`] is chosen from capability at
/// construction: native when a counter is supplied, synthetic otherwise. A
/// failed or non-positive native query degrades only the current reading;
/// switching the persistent mode is the watchdog's or the operator's call.
#[derive(Debug)]
pub struct TelemetrySource {
    mode: TelemetryMode,
    counter: Option<Arc<dyn NativeCounter>>,
    base_free_mb: u32,
    tracker: AllocationTracker,
}

impl TelemetrySource {
    /// Creates a source around an optional native counter.
    pub fn new(counter: Option<Arc<dyn NativeCounter>>, config: &TelemetryConfig) -> Self {
        let base_free_mb = config
            .base_free_mb
            .unwrap_or_else(|| Self::seed_base_free_mb(counter.as_deref(), config));
        let mode = if counter.is_some() {
            TelemetryMode::Native
        } else {
            TelemetryMode::Synthetic
        };

        match &counter {
            Some(c) => log::info!(
                "Telemetry: using native counter '{}' (synthetic base {} MB)",
                c.label(),
                base_free_mb
            ),
            None => log::info!(
                "Telemetry: no native counter, synthetic from start (base {} MB)",
                base_free_mb
            ),
        }

        Self {
            mode,
            counter,
            base_free_mb,
            tracker: AllocationTracker::new(),
        }
    }

    /// Creates a counterless source with an explicit baseline.
    pub fn synthetic(base_free_mb: u32) -> Self {
        Self {
            mode: TelemetryMode::Synthetic,
            counter: None,
            base_free_mb,
            tracker: AllocationTracker::new(),
        }
    }

    /// Seeds the synthetic baseline from the counter's total memory, or
    /// falls back to the configured constant.
    fn seed_base_free_mb(counter: Option<&dyn NativeCounter>, config: &TelemetryConfig) -> u32 {
        counter
            .and_then(|c| c.total_kb())
            .filter(|kb| *kb > 0)
            .map(|kb| {
                let total_mb = u64::try_from(kb / 1024).unwrap_or(0);
                let base = total_mb * u64::from(config.base_free_percent) / 100;
                u32::try_from(base).unwrap_or(u32::MAX)
            })
            .unwrap_or(config.fallback_base_free_mb)
    }

    /// Takes a reading.
    pub fn read(&self) -> TelemetryReading {
        if self.mode == TelemetryMode::Native {
            if let Some(counter) = &self.counter {
                match counter.query_free_kb() {
                    Ok(kb) if kb > 0 => {
                        let mb = u32::try_from(kb / 1024).unwrap_or(u32::MAX);
                        return TelemetryReading::counter(mb);
                    }
                    Ok(kb) => {
                        log::trace!("Telemetry: counter returned {} KB, using estimate", kb);
                    }
                    Err(e) => {
                        log::trace!("Telemetry: {}, using estimate", e);
                    }
                }
            }
        }
        TelemetryReading::synthetic(self.synthetic_free_mb())
    }

    /// The allocation-based estimate: `max(0, base - tracked)`.
    pub fn synthetic_free_mb(&self) -> u32 {
        u64::from(self.base_free_mb).saturating_sub(self.tracker.allocated_mb()) as u32
    }

    /// Current persistent mode.
    pub fn mode(&self) -> TelemetryMode {
        self.mode
    }

    /// Requests a persistent mode. Native is only granted when a counter
    /// exists; the resulting mode is returned.
    pub fn set_mode(&mut self, mode: TelemetryMode) -> TelemetryMode {
        let granted = match mode {
            TelemetryMode::Native if self.counter.is_none() => {
                log::warn!("Telemetry: native mode requested but no counter is available");
                TelemetryMode::Synthetic
            }
            m => m,
        };
        if granted != self.mode {
            log::info!("Telemetry: mode {:?} -> {:?}", self.mode, granted);
            self.mode = granted;
        }
        self.mode
    }

    /// Abandons the native counter until an operator re-enables it.
    pub fn demote(&mut self) {
        if self.mode != TelemetryMode::Synthetic {
            log::warn!("Telemetry: counter frozen, switching to synthetic estimate");
            self.mode = TelemetryMode::Synthetic;
        }
    }

    /// Whether a native counter was supplied.
    pub fn has_counter(&self) -> bool {
        self.counter.is_some()
    }

    /// The synthetic baseline in MB.
    pub fn base_free_mb(&self) -> u32 {
        self.base_free_mb
    }

    /// Tracked harness allocations.
    pub fn tracker(&self) -> &AllocationTracker {
        &self.tracker
    }

    /// Mutable access to the tracked harness allocations.
    pub fn tracker_mut(&mut self) -> &mut AllocationTracker {
        &mut self.tracker
    }
}
