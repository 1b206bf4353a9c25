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

//! Caller-owned context bundling telemetry and the governor.
//!
//! The rendering collaborator owns one `GovernorContext`, drives it once
//! per frame, forwards allocation notifications from its harness, and reads
//! back biases when drawing. Nothing here is process-global.

use crate::config::Settings;
use crate::governor::{Governor, TickOutcome};
use crate::snapshot::GovernorSnapshot;
use lodgov_core::{
    NativeCounter, ObjectDescriptor, ObjectId, Result, TelemetryMode, TelemetryReading,
};
use lodgov_telemetry::{TelemetryService, WatchdogVerdict};
use std::sync::Arc;
use std::time::Duration;

/// Telemetry plus governor, driven together.
#[derive(Debug)]
pub struct GovernorContext {
    telemetry: TelemetryService,
    governor: Governor,
    last_reading: Option<TelemetryReading>,
}

impl GovernorContext {
    /// Builds a context from validated settings and an optional native counter.
    pub fn new(settings: &Settings, counter: Option<Arc<dyn NativeCounter>>) -> Result<Self> {
        settings.validate()?;
        Ok(Self::from_parts(
            TelemetryService::new(counter, &settings.telemetry)?,
            Governor::new(settings.governor.clone())?,
        ))
    }

    /// Assembles a context from already-built parts.
    pub fn from_parts(telemetry: TelemetryService, governor: Governor) -> Self {
        Self {
            telemetry,
            governor,
            last_reading: None,
        }
    }

    /// Reads telemetry and advances the governor by one tick.
    pub fn frame(&mut self, now: Duration) -> TickOutcome {
        let reading = self.telemetry.read();
        self.last_reading = Some(reading);
        self.governor.tick(now, reading)
    }

    /// The harness committed one allocation block.
    pub fn on_allocation_event(&mut self) -> WatchdogVerdict {
        self.telemetry.on_allocation_event()
    }

    /// The harness committed `size_mb`.
    pub fn on_allocation_event_sized(&mut self, size_mb: u32) -> WatchdogVerdict {
        self.telemetry.on_allocation_event_sized(size_mb)
    }

    /// The harness released `size_mb`.
    pub fn on_free_event(&mut self, size_mb: u32) {
        self.telemetry.on_free_event(size_mb);
    }

    /// Operator: request native (`true`) or synthetic telemetry.
    pub fn set_telemetry_mode(&mut self, use_native: bool) -> TelemetryMode {
        self.telemetry.set_telemetry_mode(use_native)
    }

    /// Operator: flip the telemetry mode.
    pub fn toggle_telemetry(&mut self) -> TelemetryMode {
        self.telemetry.toggle_telemetry()
    }

    /// Operator: shift the global nudge.
    pub fn nudge(&mut self, delta: f32) -> f32 {
        self.governor.nudge(delta)
    }

    /// Operator: reset biases and nudge, reseed on the next frame.
    pub fn reset(&mut self) {
        self.governor.reset();
    }

    /// Harness reset: forgets every tracked allocation.
    pub fn reset_allocations(&mut self) {
        self.telemetry.reset_allocations();
    }

    /// Operator: pause or resume the control loop.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.governor.set_enabled(enabled);
    }

    /// Operator: move the target free memory by `delta_mb`.
    pub fn adjust_target(&mut self, delta_mb: i64) -> u32 {
        self.governor.adjust_target(delta_mb)
    }

    /// Creates a governed object.
    pub fn spawn_object(&mut self, desc: ObjectDescriptor) -> Result<ObjectId> {
        self.governor.spawn_object(desc)
    }

    /// An object's own bias.
    pub fn bias(&self, id: ObjectId) -> Option<f32> {
        self.governor.bias(id)
    }

    /// The operator offset.
    pub fn global_nudge(&self) -> f32 {
        self.governor.global_nudge()
    }

    /// Own bias plus global nudge.
    pub fn effective_bias(&self, id: ObjectId) -> Option<f32> {
        self.governor.effective_bias(id)
    }

    /// Reading taken by the most recent frame.
    pub fn last_reading(&self) -> Option<TelemetryReading> {
        self.last_reading
    }

    /// Diagnostic snapshot.
    pub fn snapshot(&self) -> GovernorSnapshot {
        GovernorSnapshot::capture(&self.governor, self.last_reading, self.telemetry.mode())
    }

    /// The telemetry half.
    pub fn telemetry(&self) -> &TelemetryService {
        &self.telemetry
    }

    /// Mutable telemetry half.
    pub fn telemetry_mut(&mut self) -> &mut TelemetryService {
        &mut self.telemetry
    }

    /// The governor half.
    pub fn governor(&self) -> &Governor {
        &self.governor
    }

    /// Mutable governor half.
    pub fn governor_mut(&mut self) -> &mut Governor {
        &mut self.governor
    }
}
