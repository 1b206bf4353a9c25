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

//! The governor control loop.
//!
//! Each external tick hands the governor a timestamp and a free-memory
//! reading. At most once per `eval_interval` the governor evaluates:
//!
//! 1. **Spike rule**: a drop of at least `spike_thresh_mb` since the previous
//!    evaluation steps the Low bucket by `step_spike` with its own budget.
//! 2. **Band rule**: below `target - hysteresis` every bucket is escalated by
//!    `step_gradual` (Low, Normal, High, sharing one budget); above
//!    `target + hysteresis` every bucket is relieved (High, Normal, Low).
//!    Inside the band nothing happens.
//!
//! Both rules may fire in the same evaluation, spike first.

use crate::buckets::BucketScheduler;
use crate::config::GovernorConfig;
use crate::registry::ObjectRegistry;
use lodgov_core::{ObjectDescriptor, ObjectId, Priority, Result, TelemetryReading};
use serde::Serialize;
use std::time::Duration;

/// Where a reading sits relative to the hysteresis band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BandState {
    /// Less free memory than `target - hysteresis`: degrade quality.
    Below,
    /// Inside the deadband: hold.
    Within,
    /// More free memory than `target + hysteresis`: restore quality.
    Above,
}

/// The hysteresis band in MB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Band {
    /// Lower edge, `target - hysteresis`.
    pub lo: i64,
    /// Upper edge, `target + hysteresis`.
    pub hi: i64,
}

impl Band {
    /// Classifies a free-memory value.
    pub fn classify(&self, free_mb: u32) -> BandState {
        let free = i64::from(free_mb);
        if free < self.lo {
            BandState::Below
        } else if free > self.hi {
            BandState::Above
        } else {
            BandState::Within
        }
    }
}

/// What a completed evaluation did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// The reading that was consumed.
    pub reading: TelemetryReading,
    /// Change since the previous evaluation (negative = less free memory).
    pub delta_mb: i64,
    /// Band classification of the reading.
    pub band: BandState,
    /// Whether the spike tourniquet fired.
    pub spike: bool,
    /// Object-steps spent by the spike tourniquet.
    pub spike_steps: u32,
    /// Object-steps spent by the band rule.
    pub gradual_steps: u32,
}

/// Result of a single [`Governor::tick`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The governor is paused.
    Disabled,
    /// No previous reading existed; this one was stored as the reference.
    Seeded,
    /// Too soon after the previous evaluation; nothing happened.
    RateLimited,
    /// A full evaluation ran.
    Evaluated(EvaluationReport),
}

/// Closed-loop controller converting free memory into per-object bias.
#[derive(Debug)]
pub struct Governor {
    config: GovernorConfig,
    registry: ObjectRegistry,
    buckets: BucketScheduler,
    last_free_mb: Option<u32>,
    last_eval_time: Duration,
    last_status_time: Option<Duration>,
    global_nudge: f32,
    enabled: bool,
    last_report: Option<EvaluationReport>,
}

impl Governor {
    /// Creates a governor with an empty registry.
    pub fn new(config: GovernorConfig) -> Result<Self> {
        config.validate()?;
        log::info!(
            "Governor: target={} MB ±{} MB, spike={} MB, steps={}/{}, budget={}/tick, every {:.2}s",
            config.target_free_mb,
            config.hysteresis_mb,
            config.spike_thresh_mb,
            config.step_gradual,
            config.step_spike,
            config.step_budget_per_tick,
            config.eval_interval_secs
        );
        Ok(Self {
            config,
            registry: ObjectRegistry::new(),
            buckets: BucketScheduler::new(),
            last_free_mb: None,
            last_eval_time: Duration::ZERO,
            last_status_time: None,
            global_nudge: 0.0,
            enabled: true,
            last_report: None,
        })
    }

    /// Advances the loop.
    ///
    /// `now` is a monotonic timestamp from any fixed epoch. Invalid readings
    /// are consumed like valid ones; validity only matters for diagnostics.
    pub fn tick(&mut self, now: Duration, reading: TelemetryReading) -> TickOutcome {
        if !self.enabled {
            return TickOutcome::Disabled;
        }

        let Some(last_free_mb) = self.last_free_mb else {
            self.last_free_mb = Some(reading.free_mb);
            self.last_eval_time = now;
            log::debug!("Governor: seeded at {} MB", reading.free_mb);
            return TickOutcome::Seeded;
        };

        if now.saturating_sub(self.last_eval_time) < self.config.eval_interval() {
            return TickOutcome::RateLimited;
        }

        let report = self.evaluate(last_free_mb, reading);
        self.last_free_mb = Some(reading.free_mb);
        self.last_eval_time = now;
        self.last_report = Some(report);
        self.log_status(now, &report);
        TickOutcome::Evaluated(report)
    }

    fn evaluate(&mut self, last_free_mb: u32, reading: TelemetryReading) -> EvaluationReport {
        self.buckets.rebuild(&self.registry);

        let delta_mb = i64::from(reading.free_mb) - i64::from(last_free_mb);
        let budget = self.config.step_budget_per_tick;

        let spike = delta_mb <= -i64::from(self.config.spike_thresh_mb);
        let spike_steps = if spike {
            let left =
                self.buckets
                    .apply_delta(Priority::Low, self.config.step_spike, budget, &mut self.registry);
            log::debug!("Governor: spike {} MB, tourniquet on Low bucket", delta_mb);
            budget - left
        } else {
            0
        };

        let band = self.band().classify(reading.free_mb);
        let gradual_steps = match band {
            BandState::Below => {
                budget
                    - self.buckets.apply_chain(
                        &Priority::ESCALATION_ORDER,
                        self.config.step_gradual,
                        budget,
                        &mut self.registry,
                    )
            }
            BandState::Above => {
                budget
                    - self.buckets.apply_chain(
                        &Priority::RECOVERY_ORDER,
                        -self.config.step_gradual,
                        budget,
                        &mut self.registry,
                    )
            }
            BandState::Within => 0,
        };

        log::debug!(
            "Governor: eval free={} MB Δ{:+} {:?} spike_steps={} gradual_steps={}",
            reading.free_mb,
            delta_mb,
            band,
            spike_steps,
            gradual_steps
        );

        EvaluationReport {
            reading,
            delta_mb,
            band,
            spike,
            spike_steps,
            gradual_steps,
        }
    }

    fn log_status(&mut self, now: Duration, report: &EvaluationReport) {
        let due = self
            .last_status_time
            .map_or(true, |t| now.saturating_sub(t) >= self.config.status_interval());
        if !due {
            return;
        }
        self.last_status_time = Some(now);
        let sizes = self.buckets.sizes();
        log::info!(
            "Governor: freeMB={:4} (Δ {:+4}) [{}] objs={} L/N/H={}/{}/{} nudge={:.2}",
            report.reading.free_mb,
            report.delta_mb,
            report.reading.source_label(),
            self.registry.len(),
            sizes.low,
            sizes.normal,
            sizes.high,
            self.global_nudge
        );
    }

    /// Adjusts the global nudge immediately, clamped to `±nudge_limit`.
    /// Returns the new value.
    pub fn nudge(&mut self, delta: f32) -> f32 {
        if delta.is_finite() {
            let limit = self.config.nudge_limit;
            self.global_nudge = (self.global_nudge + delta).clamp(-limit, limit);
        }
        self.global_nudge
    }

    /// Returns every object to its rest bias, clears the nudge, and forces
    /// the next tick to reseed.
    pub fn reset(&mut self) {
        self.registry.reset_biases();
        self.global_nudge = 0.0;
        self.last_free_mb = None;
        self.last_report = None;
        log::info!("Governor: reset, biases cleared");
    }

    /// Pauses or resumes the loop. Resuming forces a reseed.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;
        if enabled {
            self.last_free_mb = None;
        }
        log::info!("Governor: {}", if enabled { "enabled" } else { "paused" });
    }

    /// Whether the loop is running.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Moves the target by `delta_mb`, floored at `min_target_free_mb`.
    /// Returns the new target.
    pub fn adjust_target(&mut self, delta_mb: i64) -> u32 {
        let target = i64::from(self.config.target_free_mb) + delta_mb;
        self.set_target_free_mb(target.clamp(0, i64::from(u32::MAX)) as u32)
    }

    /// Sets the target, floored at `min_target_free_mb`. Returns the new target.
    pub fn set_target_free_mb(&mut self, target_free_mb: u32) -> u32 {
        self.config.target_free_mb = target_free_mb.max(self.config.min_target_free_mb);
        log::info!("Governor: target {} MB", self.config.target_free_mb);
        self.config.target_free_mb
    }

    /// The current hysteresis band.
    pub fn band(&self) -> Band {
        let target = i64::from(self.config.target_free_mb);
        let margin = i64::from(self.config.hysteresis_mb);
        Band {
            lo: target - margin,
            hi: target + margin,
        }
    }

    /// Creates a governed object.
    pub fn spawn_object(&mut self, desc: ObjectDescriptor) -> Result<ObjectId> {
        self.registry.spawn(desc)
    }

    /// Removes a governed object.
    pub fn despawn_object(&mut self, id: ObjectId) -> Result<()> {
        self.registry.despawn(id).map(|_| ())
    }

    /// Changes an object's priority class.
    pub fn set_priority(&mut self, id: ObjectId, priority: Priority) -> Result<()> {
        self.registry.set_priority(id, priority)
    }

    /// Shows or hides an object.
    pub fn set_visible(&mut self, id: ObjectId, visible: bool) -> Result<()> {
        self.registry.set_visible(id, visible)
    }

    /// An object's own bias.
    pub fn bias(&self, id: ObjectId) -> Option<f32> {
        self.registry.bias(id)
    }

    /// The operator offset added on top of every object's bias.
    pub fn global_nudge(&self) -> f32 {
        self.global_nudge
    }

    /// What the renderer should sample with: own bias plus global nudge.
    pub fn effective_bias(&self, id: ObjectId) -> Option<f32> {
        self.bias(id).map(|b| b + self.global_nudge)
    }

    /// The governed objects.
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// Buckets as of the last evaluation.
    pub fn buckets(&self) -> &BucketScheduler {
        &self.buckets
    }

    /// Active configuration.
    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Reading consumed by the last evaluation (or the seed).
    pub fn last_free_mb(&self) -> Option<u32> {
        self.last_free_mb
    }

    /// Report of the most recent evaluation since the last reset.
    pub fn last_report(&self) -> Option<&EvaluationReport> {
        self.last_report.as_ref()
    }
}
