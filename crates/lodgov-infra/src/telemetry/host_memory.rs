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

//! A native counter backed by host memory, for machines without a
//! memory-info extension.

use lodgov_core::{CounterError, NativeCounter};
use std::borrow::Cow;
use std::fmt;
use std::sync::Mutex;
use sysinfo::System;

/// Reports available system memory as if it were video memory.
///
/// Useful on integrated GPUs sharing system RAM, and for exercising the
/// native path on any machine.
pub struct HostMemoryCounter {
    system: Mutex<System>,
}

impl HostMemoryCounter {
    /// Creates the counter with an initial memory refresh.
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        Self {
            system: Mutex::new(system),
        }
    }
}

impl Default for HostMemoryCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HostMemoryCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostMemoryCounter").finish_non_exhaustive()
    }
}

impl NativeCounter for HostMemoryCounter {
    fn label(&self) -> Cow<'static, str> {
        Cow::Borrowed("host-memory")
    }

    fn query_free_kb(&self) -> Result<i64, CounterError> {
        let mut system = self
            .system
            .lock()
            .map_err(|_| CounterError::QueryFailed("sysinfo state poisoned".into()))?;
        system.refresh_memory();
        let kb = system.available_memory() / 1024;
        Ok(i64::try_from(kb).unwrap_or(i64::MAX))
    }

    fn total_kb(&self) -> Option<i64> {
        let system = self.system.lock().ok()?;
        let kb = system.total_memory() / 1024;
        i64::try_from(kb).ok().filter(|kb| *kb > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_counter_reports_memory() {
        let counter = HostMemoryCounter::new();
        assert_eq!(counter.label(), "host-memory");
        let free = counter.query_free_kb().unwrap();
        assert!(free >= 0);
        if let Some(total) = counter.total_kb() {
            assert!(total >= free);
        }
    }
}
