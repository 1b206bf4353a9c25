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

//! Error types for governor setup and configuration.
//!
//! Runtime telemetry problems are not errors: a failed counter query degrades
//! to the synthetic estimate. Only contradictory setup is rejected here.

use crate::object::ObjectId;
use thiserror::Error;

/// Errors raised while constructing objects or loading configuration.
#[derive(Debug, Error)]
pub enum GovernorError {
    /// An object was described with `bias_min > bias_max`.
    #[error("invalid bias range: min {min} is greater than max {max}")]
    InvalidBiasRange {
        /// The requested lower bound.
        min: f32,
        /// The requested upper bound.
        max: f32,
    },
    /// A value that must be a finite number was NaN or infinite.
    #[error("'{field}' must be a finite number")]
    NonFinite {
        /// The name of the offending field.
        field: &'static str,
    },
    /// A configuration field holds a value outside its allowed domain.
    #[error("invalid configuration for '{field}': {reason}")]
    InvalidConfig {
        /// The name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// No live object carries the given id.
    #[error("unknown object {0}")]
    UnknownObject(ObjectId),
    /// A settings document could not be parsed.
    #[error("failed to parse settings: {0}")]
    Parse(String),
    /// A settings file could not be read.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the governor crates.
pub type Result<T> = std::result::Result<T, GovernorError>;

/// Returns `Err(NonFinite)` when `value` is NaN or infinite.
pub fn ensure_finite(field: &'static str, value: f32) -> Result<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(GovernorError::NonFinite { field })
    }
}
