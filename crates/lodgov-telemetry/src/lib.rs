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

//! # LOD Governor Telemetry
//!
//! Turns native memory counters into [`TelemetryReading`]s, estimates free
//! memory from tracked allocations when no counter can be trusted, and
//! watches the counter for signs that it has stopped moving.
//!
//! [`TelemetryReading`]: lodgov_core::TelemetryReading

#![warn(missing_docs)]

pub mod config;
pub mod service;
pub mod source;
pub mod tracker;
pub mod watchdog;

pub use config::TelemetryConfig;
pub use service::TelemetryService;
pub use source::TelemetrySource;
pub use tracker::AllocationTracker;
pub use watchdog::{TelemetryWatchdog, WatchdogVerdict};
