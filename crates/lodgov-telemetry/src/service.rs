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

//! Service pairing the telemetry source with its watchdog.

use crate::config::TelemetryConfig;
use crate::source::TelemetrySource;
use crate::watchdog::{TelemetryWatchdog, WatchdogVerdict};
use lodgov_core::{NativeCounter, Result, TelemetryMode, TelemetryReading};
use std::sync::Arc;

/// Front door for everything telemetry: readings, allocation notifications
/// from the harness, and operator mode control.
#[derive(Debug)]
pub struct TelemetryService {
    source: TelemetrySource,
    watchdog: TelemetryWatchdog,
    allocation_block_mb: u32,
}

impl TelemetryService {
    /// Validates `config` and creates the service around an optional native
    /// counter.
    pub fn new(
        counter: Option<Arc<dyn NativeCounter>>,
        config: &TelemetryConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(counter, config))
    }

    fn assemble(counter: Option<Arc<dyn NativeCounter>>, config: &TelemetryConfig) -> Self {
        Self {
            source: TelemetrySource::new(counter, config),
            watchdog: TelemetryWatchdog::new(config),
            allocation_block_mb: config.allocation_block_mb,
        }
    }

    /// Takes a reading for this tick.
    pub fn read(&self) -> TelemetryReading {
        self.source.read()
    }

    /// Notifies that the harness committed one allocation block.
    pub fn on_allocation_event(&mut self) -> WatchdogVerdict {
        self.on_allocation_event_sized(self.allocation_block_mb)
    }

    /// Notifies that the harness committed `size_mb` and checks the counter.
    pub fn on_allocation_event_sized(&mut self, size_mb: u32) -> WatchdogVerdict {
        self.source.tracker_mut().record_allocation(size_mb);
        let verdict = self.watchdog.on_allocation_event(&mut self.source);
        log::debug!(
            "Telemetry: +{} MB tracked ({} live), watchdog {:?}",
            size_mb,
            self.source.tracker().live_allocations(),
            verdict
        );
        verdict
    }

    /// Notifies that the harness released `size_mb`.
    pub fn on_free_event(&mut self, size_mb: u32) {
        self.source.tracker_mut().record_free(size_mb);
        log::debug!(
            "Telemetry: -{} MB tracked ({} live)",
            size_mb,
            self.source.tracker().live_allocations()
        );
    }

    /// Forgets all tracked allocations.
    pub fn reset_allocations(&mut self) {
        self.source.tracker_mut().reset();
    }

    /// Operator control: requests native or synthetic mode.
    ///
    /// Re-enabling native mode is how an operator overrides a watchdog
    /// demotion; the watchdog starts over from a fresh reference.
    pub fn set_telemetry_mode(&mut self, use_native: bool) -> TelemetryMode {
        self.watchdog.reset();
        let requested = if use_native {
            TelemetryMode::Native
        } else {
            TelemetryMode::Synthetic
        };
        self.source.set_mode(requested)
    }

    /// Operator control: flips between native and synthetic.
    pub fn toggle_telemetry(&mut self) -> TelemetryMode {
        let use_native = self.source.mode() == TelemetryMode::Synthetic;
        self.set_telemetry_mode(use_native)
    }

    /// Current persistent mode.
    pub fn mode(&self) -> TelemetryMode {
        self.source.mode()
    }

    /// Size of one harness allocation block in MB.
    pub fn allocation_block_mb(&self) -> u32 {
        self.allocation_block_mb
    }

    /// The underlying source.
    pub fn source(&self) -> &TelemetrySource {
        &self.source
    }

    /// The underlying watchdog.
    pub fn watchdog(&self) -> &TelemetryWatchdog {
        &self.watchdog
    }
}

impl Default for TelemetryService {
    fn default() -> Self {
        Self::assemble(None, &TelemetryConfig::default())
    }
}
