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

//! Bookkeeping of harness allocations for the synthetic estimate.

/// Running total of memory the harness reports as committed.
///
/// The tracker never observes memory itself. It only sums the allocation and
/// free notifications it is given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationTracker {
    allocated_mb: u64,
    live_allocations: u32,
}

impl AllocationTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a committed allocation of `size_mb`.
    pub fn record_allocation(&mut self, size_mb: u32) {
        self.allocated_mb = self.allocated_mb.saturating_add(u64::from(size_mb));
        self.live_allocations = self.live_allocations.saturating_add(1);
    }

    /// Records a released allocation of `size_mb`. Over-freeing floors at zero.
    pub fn record_free(&mut self, size_mb: u32) {
        self.allocated_mb = self.allocated_mb.saturating_sub(u64::from(size_mb));
        self.live_allocations = self.live_allocations.saturating_sub(1);
    }

    /// Total tracked memory in MB.
    pub fn allocated_mb(&self) -> u64 {
        self.allocated_mb
    }

    /// Number of allocations not yet freed.
    pub fn live_allocations(&self) -> u32 {
        self.live_allocations
    }

    /// Forgets every tracked allocation.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
