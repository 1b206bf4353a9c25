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

//! Vendor memory-info counters behind one type.
//!
//! NVX and ATI expose free video memory through different parameter names
//! and result layouts. The vendor is picked once from the extension list;
//! afterwards every query goes through the same [`NativeCounter`] impl.

use lodgov_core::{CounterError, CounterVendor, NativeCounter};
use std::borrow::Cow;
use std::fmt::Debug;
use std::sync::Arc;

/// Parameter names of the memory-info extensions.
pub mod pname {
    /// NVX: dedicated video memory, in KB.
    pub const GPU_MEMORY_INFO_DEDICATED_VIDMEM_NVX: u32 = 0x9047;
    /// NVX: total available memory, in KB.
    pub const GPU_MEMORY_INFO_TOTAL_AVAILABLE_MEMORY_NVX: u32 = 0x9048;
    /// NVX: currently available video memory, in KB.
    pub const GPU_MEMORY_INFO_CURRENT_AVAILABLE_VIDMEM_NVX: u32 = 0x9049;
    /// ATI: texture pool free memory, four KB values.
    pub const TEXTURE_FREE_MEMORY_ATI: u32 = 0x87FC;
}

/// Raw integer state queries offered by the rendering backend.
///
/// This is the `glGetIntegerv` + `glGetError` pair: fill `out` for `pname`,
/// or report that the query raised an error.
pub trait IntegerQuery: Send + Sync + Debug {
    /// Extension strings advertised by the context.
    fn extensions(&self) -> Vec<String>;

    /// Fills `out` with the integer state for `pname`.
    fn get_integers(&self, pname: u32, out: &mut [i32]) -> Result<(), CounterError>;
}

impl<Q: IntegerQuery + ?Sized> IntegerQuery for Arc<Q> {
    fn extensions(&self) -> Vec<String> {
        (**self).extensions()
    }

    fn get_integers(&self, pname: u32, out: &mut [i32]) -> Result<(), CounterError> {
        (**self).get_integers(pname, out)
    }
}

/// A native counter reading one of the vendor memory-info extensions.
#[derive(Debug)]
pub struct VendorCounter<Q: IntegerQuery> {
    vendor: CounterVendor,
    query: Q,
}

impl<Q: IntegerQuery> VendorCounter<Q> {
    /// Wraps `query` for an already-selected vendor.
    pub fn new(vendor: CounterVendor, query: Q) -> Self {
        Self { vendor, query }
    }

    /// Scans the advertised extensions and wraps `query` if a supported
    /// counter exists.
    pub fn detect(query: Q) -> Option<Self> {
        let extensions = query.extensions();
        match CounterVendor::select(extensions.iter().map(String::as_str)) {
            Some(vendor) => Some(Self::new(vendor, query)),
            None => {
                log::debug!(
                    "Telemetry: no memory-info extension among {} advertised",
                    extensions.len()
                );
                None
            }
        }
    }

    /// The selected vendor.
    pub fn vendor(&self) -> CounterVendor {
        self.vendor
    }
}

impl<Q: IntegerQuery> NativeCounter for VendorCounter<Q> {
    fn label(&self) -> Cow<'static, str> {
        Cow::Borrowed(self.vendor.extension_name())
    }

    fn query_free_kb(&self) -> Result<i64, CounterError> {
        match self.vendor {
            CounterVendor::Nvx => {
                let mut kb = [0i32; 1];
                self.query
                    .get_integers(pname::GPU_MEMORY_INFO_CURRENT_AVAILABLE_VIDMEM_NVX, &mut kb)?;
                Ok(i64::from(kb[0]))
            }
            CounterVendor::Ati => {
                // [free, largest free block, free aux, largest aux block]
                let mut kb = [0i32; 4];
                self.query
                    .get_integers(pname::TEXTURE_FREE_MEMORY_ATI, &mut kb)?;
                Ok(i64::from(kb[0]))
            }
        }
    }

    fn total_kb(&self) -> Option<i64> {
        match self.vendor {
            CounterVendor::Nvx => {
                let mut kb = [0i32; 1];
                self.query
                    .get_integers(pname::GPU_MEMORY_INFO_DEDICATED_VIDMEM_NVX, &mut kb)
                    .ok()
                    .map(|_| i64::from(kb[0]))
                    .filter(|kb| *kb > 0)
            }
            CounterVendor::Ati => None,
        }
    }
}
