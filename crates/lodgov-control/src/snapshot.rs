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

//! Diagnostic snapshot of the governor for HUDs and logs.

use crate::buckets::BucketSizes;
use crate::governor::{Band, BandState, Governor};
use lodgov_core::{ObjectId, Priority, TelemetryMode, TelemetryReading};
use serde::Serialize;
use std::fmt;

/// Bias of one object at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObjectBias {
    /// Object identity.
    pub id: ObjectId,
    /// Priority class.
    pub priority: Priority,
    /// Whether the object took part in bucketing.
    pub visible: bool,
    /// Own bias, without the global nudge.
    pub bias: f32,
}

/// Point-in-time view of the governor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GovernorSnapshot {
    /// Most recent reading handed to the governor, if any.
    pub reading: Option<TelemetryReading>,
    /// Persistent telemetry mode.
    pub mode: TelemetryMode,
    /// Whether the control loop is running.
    pub enabled: bool,
    /// Current target in MB.
    pub target_free_mb: u32,
    /// Current hysteresis band.
    pub band: Band,
    /// Classification of `reading` against `band`.
    pub band_state: Option<BandState>,
    /// Bucket sizes as of the last evaluation.
    pub buckets: BucketSizes,
    /// Operator offset.
    pub global_nudge: f32,
    /// Every live object, in id order.
    pub objects: Vec<ObjectBias>,
}

impl GovernorSnapshot {
    /// Captures the governor's state alongside telemetry details.
    pub fn capture(
        governor: &Governor,
        reading: Option<TelemetryReading>,
        mode: TelemetryMode,
    ) -> Self {
        let band = governor.band();
        Self {
            reading,
            mode,
            enabled: governor.is_enabled(),
            target_free_mb: governor.config().target_free_mb,
            band,
            band_state: reading.map(|r| band.classify(r.free_mb)),
            buckets: governor.buckets().sizes(),
            global_nudge: governor.global_nudge(),
            objects: governor
                .registry()
                .iter()
                .map(|o| ObjectBias {
                    id: o.id(),
                    priority: o.priority(),
                    visible: o.is_visible(),
                    bias: o.bias(),
                })
                .collect(),
        }
    }
}

impl fmt::Display for GovernorSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reading {
            Some(r) => write!(f, "freeMB={} [{}]", r.free_mb, r.source_label())?,
            None => write!(f, "freeMB=? [none]")?,
        }
        write!(
            f,
            " {:?} target={} band=[{}, {}]",
            self.mode, self.target_free_mb, self.band.lo, self.band.hi
        )?;
        if let Some(state) = self.band_state {
            write!(f, " {state:?}")?;
        }
        write!(
            f,
            " L/N/H={}/{}/{} nudge={:.2}",
            self.buckets.low, self.buckets.normal, self.buckets.high, self.global_nudge
        )?;
        if !self.enabled {
            write!(f, " (paused)")?;
        }
        for object in &self.objects {
            write!(
                f,
                " {}{}={:.2}",
                object.priority.short_name(),
                object.id.raw(),
                object.bias
            )?;
        }
        Ok(())
    }
}
