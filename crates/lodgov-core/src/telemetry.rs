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

//! Contracts for memory telemetry.
//!
//! The core only describes *what* a reading is and *what* a native counter
//! must answer. `lodgov-telemetry` turns counters into readings with a
//! synthetic fallback, and `lodgov-infra` provides the concrete counters.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::Debug;
use thiserror::Error;

/// A single free-memory observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TelemetryReading {
    /// `true` when the value came from a real counter this cycle.
    pub valid: bool,
    /// Estimated available memory in megabytes.
    pub free_mb: u32,
}

impl TelemetryReading {
    /// A reading taken from a native counter.
    pub const fn counter(free_mb: u32) -> Self {
        Self {
            valid: true,
            free_mb,
        }
    }

    /// A reading derived from allocation bookkeeping.
    pub const fn synthetic(free_mb: u32) -> Self {
        Self {
            valid: false,
            free_mb,
        }
    }

    /// Short label for diagnostics.
    pub const fn source_label(&self) -> &'static str {
        if self.valid {
            "telemetry"
        } else {
            "fallback"
        }
    }
}

/// The persistent strategy of a telemetry source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TelemetryMode {
    /// Query the native counter, falling back per call on failure.
    Native,
    /// Always estimate from tracked allocations.
    #[default]
    Synthetic,
}

/// Graphics-memory counter extensions known to the governor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CounterVendor {
    /// `GL_NVX_gpu_memory_info`.
    Nvx,
    /// `GL_ATI_meminfo`.
    Ati,
}

impl CounterVendor {
    /// The extension string advertising this counter.
    pub const fn extension_name(self) -> &'static str {
        match self {
            CounterVendor::Nvx => "GL_NVX_gpu_memory_info",
            CounterVendor::Ati => "GL_ATI_meminfo",
        }
    }

    /// Picks a vendor from the advertised extension list, preferring NVX.
    pub fn select<'a, I>(extensions: I) -> Option<CounterVendor>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut nvx = false;
        let mut ati = false;
        for ext in extensions {
            if ext == CounterVendor::Nvx.extension_name() {
                nvx = true;
            } else if ext == CounterVendor::Ati.extension_name() {
                ati = true;
            }
        }
        log::info!("Telemetry: capability scan NVX={} ATI={}", nvx, ati);
        if nvx {
            Some(CounterVendor::Nvx)
        } else if ati {
            Some(CounterVendor::Ati)
        } else {
            None
        }
    }
}

/// Failure of a single native counter query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CounterError {
    /// The backend reported an error for the query.
    #[error("counter query failed: {0}")]
    QueryFailed(String),
    /// The counter does not exist on this device.
    #[error("counter not supported by this device")]
    Unsupported,
}

/// A hardware (or host) counter that reports available memory.
///
/// Implementations live in `lodgov-infra` or in the rendering collaborator.
/// A query may fail or report nonsense at any time; the telemetry source
/// treats both as "no reading this call".
pub trait NativeCounter: Send + Sync + Debug {
    /// Human-readable identifier for logs.
    fn label(&self) -> Cow<'static, str>;

    /// Current available memory in kilobytes.
    fn query_free_kb(&self) -> Result<i64, CounterError>;

    /// Total memory behind the counter in kilobytes, if known.
    fn total_kb(&self) -> Option<i64> {
        None
    }
}
