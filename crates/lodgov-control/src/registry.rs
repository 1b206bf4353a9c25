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

//! Registry of governed objects.
//!
//! The owning collaborator decides which objects exist and sets their
//! priority and visibility. Bias is written only by the bucket scheduler and
//! by a governor reset, both inside this crate.

use lodgov_core::{GovernorError, ObjectDescriptor, ObjectId, Priority, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// An entity whose texture LOD bias is under governor control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GovernedObject {
    id: ObjectId,
    priority: Priority,
    bias: f32,
    #[serde(skip)]
    rest_bias: f32,
    bias_min: f32,
    bias_max: f32,
    visible: bool,
    estimated_cost: f32,
}

impl GovernedObject {
    fn from_descriptor(id: ObjectId, desc: &ObjectDescriptor) -> Result<Self> {
        desc.validate()?;
        Ok(Self {
            id,
            priority: desc.priority,
            bias: desc.rest_bias(),
            rest_bias: desc.rest_bias(),
            bias_min: desc.bias_min,
            bias_max: desc.bias_max,
            visible: desc.visible,
            estimated_cost: desc.estimated_cost,
        })
    }

    /// Stable identity.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Current priority class.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Current bias; always within `[bias_min, bias_max]`.
    pub fn bias(&self) -> f32 {
        self.bias
    }

    /// Lower clamp bound.
    pub fn bias_min(&self) -> f32 {
        self.bias_min
    }

    /// Upper clamp bound.
    pub fn bias_max(&self) -> f32 {
        self.bias_max
    }

    /// Whether the object takes part in bucketing.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Relative sizing hint.
    pub fn estimated_cost(&self) -> f32 {
        self.estimated_cost
    }

    /// Adds `delta` and clamps. Returns `true` if the bias actually changed.
    pub(crate) fn step_bias(&mut self, delta: f32) -> bool {
        let old = self.bias;
        self.bias = (self.bias + delta).clamp(self.bias_min, self.bias_max);
        self.bias != old
    }

    pub(crate) fn reset_bias(&mut self) {
        self.bias = self.rest_bias;
    }
}

/// All governed objects, keyed by id.
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    objects: BTreeMap<ObjectId, GovernedObject>,
    next_id: u32,
}

impl ObjectRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `desc` and creates an object from it.
    pub fn spawn(&mut self, desc: ObjectDescriptor) -> Result<ObjectId> {
        let id = ObjectId::new(self.next_id);
        let object = GovernedObject::from_descriptor(id, &desc)?;
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| GovernorError::InvalidConfig {
                field: "object id",
                reason: "id space exhausted".into(),
            })?;

        log::debug!(
            "ObjectRegistry: spawned {} ({:?}, cost={:.1}, bias=[{}, {}])",
            id,
            object.priority,
            object.estimated_cost,
            object.bias_min,
            object.bias_max
        );
        self.objects.insert(id, object);
        Ok(id)
    }

    /// Removes an object. Its id is never handed out again.
    pub fn despawn(&mut self, id: ObjectId) -> Result<GovernedObject> {
        self.objects
            .remove(&id)
            .ok_or(GovernorError::UnknownObject(id))
    }

    /// Moves an object to another priority class. Takes effect at the next
    /// evaluation.
    pub fn set_priority(&mut self, id: ObjectId, priority: Priority) -> Result<()> {
        self.get_mut(id)?.priority = priority;
        Ok(())
    }

    /// Shows or hides an object. Hidden objects keep their bias.
    pub fn set_visible(&mut self, id: ObjectId, visible: bool) -> Result<()> {
        self.get_mut(id)?.visible = visible;
        Ok(())
    }

    /// Looks up an object.
    pub fn get(&self, id: ObjectId) -> Option<&GovernedObject> {
        self.objects.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: ObjectId) -> Result<&mut GovernedObject> {
        self.objects
            .get_mut(&id)
            .ok_or(GovernorError::UnknownObject(id))
    }

    /// Current bias of an object.
    pub fn bias(&self, id: ObjectId) -> Option<f32> {
        self.get(id).map(GovernedObject::bias)
    }

    /// Iterates objects in id order.
    pub fn iter(&self) -> impl Iterator<Item = &GovernedObject> {
        self.objects.values()
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if no objects are registered.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub(crate) fn reset_biases(&mut self) {
        for object in self.objects.values_mut() {
            object.reset_bias();
        }
    }
}
