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

//! Identity, priority, and creation parameters for governed objects.

use crate::error::{ensure_finite, GovernorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a governed object.
///
/// Ids are assigned by the registry at creation and are never reused while
/// the registry lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Wraps a raw index.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw index.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Priority class of a governed object.
///
/// Low-priority objects lose quality first under pressure and regain it last.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum Priority {
    /// Sacrificed first.
    Low,
    /// The default class.
    #[default]
    Normal,
    /// Protected until the other classes are exhausted.
    High,
}

impl Priority {
    /// All classes, lowest first.
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Normal, Priority::High];

    /// Bucket order used when relieving memory pressure.
    pub const ESCALATION_ORDER: [Priority; 3] = [Priority::Low, Priority::Normal, Priority::High];

    /// Bucket order used when restoring quality.
    pub const RECOVERY_ORDER: [Priority; 3] = [Priority::High, Priority::Normal, Priority::Low];

    /// Single-letter tag used in status lines.
    pub const fn short_name(self) -> &'static str {
        match self {
            Priority::Low => "L",
            Priority::Normal => "N",
            Priority::High => "H",
        }
    }
}

/// Creation parameters for a governed object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectDescriptor {
    /// Initial priority class.
    pub priority: Priority,
    /// Lower clamp bound for the bias.
    pub bias_min: f32,
    /// Upper clamp bound for the bias.
    pub bias_max: f32,
    /// Whether the object takes part in bucketing.
    pub visible: bool,
    /// Relative sizing hint used to order objects inside a bucket.
    pub estimated_cost: f32,
}

impl Default for ObjectDescriptor {
    fn default() -> Self {
        Self {
            priority: Priority::Normal,
            bias_min: 0.0,
            bias_max: 8.0,
            visible: true,
            estimated_cost: 64.0,
        }
    }
}

impl ObjectDescriptor {
    /// A visible descriptor with default bounds and the given priority and cost.
    pub fn new(priority: Priority, estimated_cost: f32) -> Self {
        Self {
            priority,
            estimated_cost,
            ..Default::default()
        }
    }

    /// Replaces the bias bounds.
    pub fn with_bounds(mut self, bias_min: f32, bias_max: f32) -> Self {
        self.bias_min = bias_min;
        self.bias_max = bias_max;
        self
    }

    /// Replaces the initial visibility.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Rejects descriptors that cannot satisfy the bound invariant.
    pub fn validate(&self) -> Result<()> {
        let min = ensure_finite("bias_min", self.bias_min)?;
        let max = ensure_finite("bias_max", self.bias_max)?;
        if min > max {
            return Err(GovernorError::InvalidBiasRange { min, max });
        }
        ensure_finite("estimated_cost", self.estimated_cost)?;
        Ok(())
    }

    /// The bias an object starts from (and returns to on reset): zero,
    /// clamped into the object's bounds.
    pub fn rest_bias(&self) -> f32 {
        0.0_f32.clamp(self.bias_min, self.bias_max)
    }
}
