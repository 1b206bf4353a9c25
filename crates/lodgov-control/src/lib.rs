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

//! # LOD Governor Control
//!
//! The feedback loop that turns a free-memory signal into bounded texture
//! LOD bias adjustments for a priority-bucketed set of objects.
//!
//! Start from [`GovernorContext`]: it owns the telemetry service and the
//! [`Governor`], and is driven once per frame by the rendering collaborator.

#![warn(missing_docs)]

pub mod buckets;
pub mod config;
pub mod context;
pub mod governor;
pub mod registry;
pub mod snapshot;

pub use buckets::{BucketScheduler, BucketSizes};
pub use config::{GovernorConfig, Settings};
pub use context::GovernorContext;
pub use governor::{Band, BandState, EvaluationReport, Governor, TickOutcome};
pub use registry::{GovernedObject, ObjectRegistry};
pub use snapshot::{GovernorSnapshot, ObjectBias};
