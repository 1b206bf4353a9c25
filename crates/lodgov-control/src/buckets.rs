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

//! Priority buckets and budgeted bias stepping.
//!
//! Visible objects are partitioned by priority class. Inside a bucket the
//! most expensive objects come first, so a limited step budget lands where it
//! frees the most memory. Ties are broken by id to keep the order stable.

use crate::registry::ObjectRegistry;
use lodgov_core::{ObjectId, Priority};
use serde::Serialize;

/// Number of objects in each bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketSizes {
    /// Visible low-priority objects.
    pub low: usize,
    /// Visible normal-priority objects.
    pub normal: usize,
    /// Visible high-priority objects.
    pub high: usize,
}

/// Partitions the registry and applies bounded bias deltas.
#[derive(Debug, Default)]
pub struct BucketScheduler {
    low: Vec<ObjectId>,
    normal: Vec<ObjectId>,
    high: Vec<ObjectId>,
}

impl BucketScheduler {
    /// Creates empty buckets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-partitions the visible objects of `registry`.
    pub fn rebuild(&mut self, registry: &ObjectRegistry) {
        let mut low = Vec::new();
        let mut normal = Vec::new();
        let mut high = Vec::new();

        for object in registry.iter().filter(|o| o.is_visible()) {
            let entry = (object.estimated_cost(), object.id());
            match object.priority() {
                Priority::Low => low.push(entry),
                Priority::Normal => normal.push(entry),
                Priority::High => high.push(entry),
            }
        }

        self.low = Self::order(low);
        self.normal = Self::order(normal);
        self.high = Self::order(high);
    }

    /// Cost descending, then id ascending.
    fn order(mut entries: Vec<(f32, ObjectId)>) -> Vec<ObjectId> {
        entries.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        entries.into_iter().map(|(_, id)| id).collect()
    }

    /// The ordered members of one bucket.
    pub fn bucket(&self, priority: Priority) -> &[ObjectId] {
        match priority {
            Priority::Low => &self.low,
            Priority::Normal => &self.normal,
            Priority::High => &self.high,
        }
    }

    /// Current bucket sizes.
    pub fn sizes(&self) -> BucketSizes {
        BucketSizes {
            low: self.low.len(),
            normal: self.normal.len(),
            high: self.high.len(),
        }
    }

    /// Walks one bucket in order, adding `delta` to each bias.
    ///
    /// Only a step that actually changes a bias costs budget; objects pinned
    /// at a bound are passed over for free. Returns the budget left over so
    /// callers can chain buckets.
    pub fn apply_delta(
        &self,
        priority: Priority,
        delta: f32,
        mut budget: u32,
        registry: &mut ObjectRegistry,
    ) -> u32 {
        for &id in self.bucket(priority) {
            if budget == 0 {
                break;
            }
            // Despawned since the last rebuild.
            let Ok(object) = registry.get_mut(id) else {
                continue;
            };
            let before = object.bias();
            if object.step_bias(delta) {
                budget -= 1;
                log::trace!(
                    "Buckets: {} {:?} bias {:.3} -> {:.3}",
                    id,
                    priority,
                    before,
                    object.bias()
                );
            }
        }
        budget
    }

    /// Applies `delta` across several buckets in order, sharing one budget.
    /// Returns the budget left over.
    pub fn apply_chain(
        &self,
        order: &[Priority],
        delta: f32,
        budget: u32,
        registry: &mut ObjectRegistry,
    ) -> u32 {
        order.iter().fold(budget, |remaining, &priority| {
            self.apply_delta(priority, delta, remaining, registry)
        })
    }
}
