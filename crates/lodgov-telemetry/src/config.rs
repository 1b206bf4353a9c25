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

//! Tunables for the telemetry source and its watchdog.

use lodgov_core::{GovernorError, Result};
use serde::{Deserialize, Serialize};

/// Configuration of the telemetry pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Explicit synthetic baseline in MB. Overrides any seeding from the counter.
    pub base_free_mb: Option<u32>,
    /// Synthetic baseline used when the counter cannot report its total.
    pub fallback_base_free_mb: u32,
    /// Percentage of the counter's total memory used as the synthetic baseline.
    pub base_free_percent: u32,
    /// Size of one harness allocation in MB.
    pub allocation_block_mb: u32,
    /// Minimum drop in free memory expected after one allocation.
    pub min_expected_delta_mb: u32,
    /// Stalled checks in a row before the counter is abandoned.
    pub consecutive_failures: u32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            base_free_mb: None,
            fallback_base_free_mb: 6000,
            base_free_percent: 90,
            allocation_block_mb: 256,
            min_expected_delta_mb: 128,
            consecutive_failures: 2,
        }
    }
}

impl TelemetryConfig {
    /// Rejects values the source and watchdog cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.base_free_percent) {
            return Err(GovernorError::InvalidConfig {
                field: "base_free_percent",
                reason: format!("{} is outside 1..=100", self.base_free_percent),
            });
        }
        if self.allocation_block_mb == 0 {
            return Err(GovernorError::InvalidConfig {
                field: "allocation_block_mb",
                reason: "must be at least 1".into(),
            });
        }
        if self.consecutive_failures == 0 {
            return Err(GovernorError::InvalidConfig {
                field: "consecutive_failures",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(TelemetryConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_failures_rejected() {
        let config = TelemetryConfig {
            consecutive_failures: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_percent_out_of_range_rejected() {
        for percent in [0, 101, u32::MAX] {
            let config = TelemetryConfig {
                base_free_percent: percent,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "percent {percent} accepted");
        }
    }
}
