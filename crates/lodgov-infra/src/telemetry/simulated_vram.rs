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

//! An in-process stand-in for a GPU exposing a memory-info extension.

use super::vendor_counter::{pname, IntegerQuery};
use lodgov_core::CounterError;
use std::sync::Mutex;

/// How the simulated counter responds to queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CounterBehavior {
    /// Reports the live free amount.
    #[default]
    Live,
    /// Keeps reporting the free amount seen when the counter froze.
    Frozen,
    /// Every query raises an error.
    Failing,
}

#[derive(Debug)]
struct DeviceState {
    committed_mb: u64,
    behavior: CounterBehavior,
    frozen_free_mb: u64,
}

/// A fake device with a fixed amount of dedicated memory.
///
/// Committing memory lowers the free amount the counter reports, unless the
/// counter was frozen or set to fail.
#[derive(Debug)]
pub struct SimulatedVramDevice {
    total_mb: u64,
    extensions: Vec<String>,
    state: Mutex<DeviceState>,
}

impl SimulatedVramDevice {
    /// A device advertising `GL_NVX_gpu_memory_info`.
    pub fn nvx(total_mb: u64) -> Self {
        Self::with_extensions(total_mb, &["GL_NVX_gpu_memory_info"])
    }

    /// A device advertising `GL_ATI_meminfo`.
    pub fn ati(total_mb: u64) -> Self {
        Self::with_extensions(total_mb, &["GL_ATI_meminfo"])
    }

    /// A device advertising an arbitrary extension list.
    pub fn with_extensions(total_mb: u64, extensions: &[&str]) -> Self {
        Self {
            total_mb,
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            state: Mutex::new(DeviceState {
                committed_mb: 0,
                behavior: CounterBehavior::Live,
                frozen_free_mb: total_mb,
            }),
        }
    }

    /// Total dedicated memory in MB.
    pub fn total_mb(&self) -> u64 {
        self.total_mb
    }

    /// Commits `mb` of device memory.
    pub fn commit(&self, mb: u64) {
        if let Ok(mut state) = self.state.lock() {
            state.committed_mb = state.committed_mb.saturating_add(mb);
        }
    }

    /// Releases up to `mb` of committed memory.
    pub fn release(&self, mb: u64) {
        if let Ok(mut state) = self.state.lock() {
            state.committed_mb = state.committed_mb.saturating_sub(mb);
        }
    }

    /// Releases everything committed so far.
    pub fn release_all(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.committed_mb = 0;
        }
    }

    /// Currently committed memory in MB.
    pub fn committed_mb(&self) -> u64 {
        self.state.lock().map(|s| s.committed_mb).unwrap_or(0)
    }

    /// Real free memory in MB, regardless of the counter behavior.
    pub fn free_mb(&self) -> u64 {
        self.total_mb.saturating_sub(self.committed_mb())
    }

    /// Switches the counter behavior. Freezing captures the current free
    /// amount.
    pub fn set_behavior(&self, behavior: CounterBehavior) {
        if let Ok(mut state) = self.state.lock() {
            if behavior == CounterBehavior::Frozen {
                state.frozen_free_mb = self.total_mb.saturating_sub(state.committed_mb);
            }
            state.behavior = behavior;
        }
    }

    /// The current counter behavior.
    pub fn behavior(&self) -> CounterBehavior {
        self.state
            .lock()
            .map(|s| s.behavior)
            .unwrap_or(CounterBehavior::Failing)
    }

    fn reported_free_kb(&self) -> Result<i32, CounterError> {
        let state = self
            .state
            .lock()
            .map_err(|_| CounterError::QueryFailed("device state poisoned".into()))?;
        let free_mb = match state.behavior {
            CounterBehavior::Live => self.total_mb.saturating_sub(state.committed_mb),
            CounterBehavior::Frozen => state.frozen_free_mb,
            CounterBehavior::Failing => {
                return Err(CounterError::QueryFailed("GL_INVALID_OPERATION".into()))
            }
        };
        Ok(mb_to_kb(free_mb))
    }
}

fn mb_to_kb(mb: u64) -> i32 {
    i32::try_from(mb.saturating_mul(1024)).unwrap_or(i32::MAX)
}

impl IntegerQuery for SimulatedVramDevice {
    fn extensions(&self) -> Vec<String> {
        self.extensions.clone()
    }

    fn get_integers(&self, pname: u32, out: &mut [i32]) -> Result<(), CounterError> {
        match pname {
            pname::GPU_MEMORY_INFO_CURRENT_AVAILABLE_VIDMEM_NVX => {
                let free = self.reported_free_kb()?;
                out.fill(0);
                if let Some(slot) = out.first_mut() {
                    *slot = free;
                }
            }
            pname::GPU_MEMORY_INFO_DEDICATED_VIDMEM_NVX
            | pname::GPU_MEMORY_INFO_TOTAL_AVAILABLE_MEMORY_NVX => {
                out.fill(mb_to_kb(self.total_mb));
            }
            pname::TEXTURE_FREE_MEMORY_ATI => {
                let free = self.reported_free_kb()?;
                out.fill(free);
            }
            _ => return Err(CounterError::Unsupported),
        }
        Ok(())
    }
}
