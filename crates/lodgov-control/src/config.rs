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

//! Configuration for the governor control loop.
//!
//! Settings are plain `serde` structs with defaults for every field, so a
//! settings file only needs to name what it changes:
//!
//! ```ron
//! (
//!     governor: (target_free_mb: 1536, step_budget_per_tick: 2),
//!     telemetry: (allocation_block_mb: 512),
//! )
//! ```

use lodgov_core::{GovernorError, Result};
use lodgov_telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Control bands and tuning constants of the governor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    /// Free memory the loop steers toward, in MB.
    pub target_free_mb: u32,
    /// Half-width of the deadband around the target, in MB.
    pub hysteresis_mb: u32,
    /// Drop between two evaluations that counts as a spike, in MB.
    pub spike_thresh_mb: u32,
    /// Bias step of the gradual band rule.
    pub step_gradual: f32,
    /// Bias step of the spike tourniquet.
    pub step_spike: f32,
    /// Object-steps allowed per action per evaluation.
    pub step_budget_per_tick: u32,
    /// Minimum time between two evaluations, in seconds.
    pub eval_interval_secs: f64,
    /// Minimum time between two status log lines, in seconds.
    pub status_interval_secs: f64,
    /// The global nudge is clamped to `[-nudge_limit, nudge_limit]`.
    pub nudge_limit: f32,
    /// Nudge applied by one operator key press.
    pub nudge_step: f32,
    /// Target change applied by one operator key press, in MB.
    pub target_step_mb: u32,
    /// Floor for operator target adjustments, in MB.
    pub min_target_free_mb: u32,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            target_free_mb: 1024,
            hysteresis_mb: 128,
            spike_thresh_mb: 256,
            step_gradual: 0.5,
            step_spike: 1.25,
            step_budget_per_tick: 4,
            eval_interval_secs: 0.25,
            status_interval_secs: 0.5,
            nudge_limit: 4.0,
            nudge_step: 0.125,
            target_step_mb: 256,
            min_target_free_mb: 128,
        }
    }
}

impl GovernorConfig {
    /// Rejects contradictory or non-finite tuning.
    pub fn validate(&self) -> Result<()> {
        non_negative_step("step_gradual", self.step_gradual)?;
        non_negative_step("step_spike", self.step_spike)?;
        non_negative_step("nudge_step", self.nudge_step)?;

        if !self.nudge_limit.is_finite() || self.nudge_limit <= 0.0 {
            return Err(invalid("nudge_limit", "must be a positive finite number"));
        }
        if !Duration::try_from_secs_f64(self.eval_interval_secs).is_ok_and(|d| !d.is_zero()) {
            return Err(invalid(
                "eval_interval_secs",
                "must be a positive number of seconds representable as a Duration",
            ));
        }
        if Duration::try_from_secs_f64(self.status_interval_secs).is_err() {
            return Err(invalid(
                "status_interval_secs",
                "must be >= 0 seconds and representable as a Duration",
            ));
        }
        if self.spike_thresh_mb == 0 {
            return Err(invalid("spike_thresh_mb", "must be at least 1"));
        }
        if self.min_target_free_mb > self.target_free_mb {
            return Err(invalid(
                "min_target_free_mb",
                "must not exceed target_free_mb",
            ));
        }
        Ok(())
    }

    /// Minimum time between two evaluations.
    pub fn eval_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.eval_interval_secs).unwrap_or(Duration::MAX)
    }

    /// Minimum time between two status log lines.
    pub fn status_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.status_interval_secs).unwrap_or(Duration::MAX)
    }
}

fn invalid(field: &'static str, reason: &str) -> GovernorError {
    GovernorError::InvalidConfig {
        field,
        reason: reason.to_string(),
    }
}

fn non_negative_step(field: &'static str, value: f32) -> Result<()> {
    if !value.is_finite() {
        return Err(GovernorError::NonFinite { field });
    }
    if value < 0.0 {
        return Err(invalid(field, "must not be negative"));
    }
    Ok(())
}

/// Everything a governor context needs, as loaded from a settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Control loop tuning.
    pub governor: GovernorConfig,
    /// Telemetry source and watchdog tuning.
    pub telemetry: TelemetryConfig,
}

impl Settings {
    /// Parses and validates a RON settings document.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let settings: Settings =
            ron::from_str(text).map_err(|e| GovernorError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads, parses and validates a RON settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        log::info!("Settings: loaded '{}'", path.display());
        Self::from_ron_str(&text)
    }

    /// Serializes to pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        let pretty = ron::ser::PrettyConfig::default().indentor("  ".to_string());
        ron::ser::to_string_pretty(self, pretty).map_err(|e| GovernorError::Parse(e.to_string()))
    }

    /// Validates both halves.
    pub fn validate(&self) -> Result<()> {
        self.governor.validate()?;
        self.telemetry.validate()
    }
}
