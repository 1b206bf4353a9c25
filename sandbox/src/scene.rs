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

//! The demo scene: governed objects laid out on a small grid.

use std::collections::HashMap;

use lodgov_control::GovernorContext;
use lodgov_core::{ObjectDescriptor, ObjectId, Priority, Result};

const COLUMNS: u32 = 3;

/// Where an object is drawn. Placement is demo metadata only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub column: u32,
    pub row: u32,
}

#[derive(Debug)]
pub struct Scene {
    order: Vec<ObjectId>,
    cells: HashMap<ObjectId, GridCell>,
    last_frame: String,
}

impl Scene {
    /// Two objects per priority with distinct estimated costs.
    pub fn demo(ctx: &mut GovernorContext) -> Result<Self> {
        let specs = [
            (Priority::Low, 200.0),
            (Priority::Low, 150.0),
            (Priority::Normal, 180.0),
            (Priority::Normal, 120.0),
            (Priority::High, 220.0),
            (Priority::High, 100.0),
        ];

        let mut order = Vec::with_capacity(specs.len());
        let mut cells = HashMap::with_capacity(specs.len());
        for (index, (priority, cost)) in (0u32..).zip(specs) {
            let id = ctx.spawn_object(ObjectDescriptor::new(priority, cost))?;
            let cell = GridCell {
                column: index % COLUMNS,
                row: index / COLUMNS,
            };
            log::debug!(
                "Scene: {} {}{} at ({}, {})",
                id,
                priority.short_name(),
                cost,
                cell.column,
                cell.row
            );
            order.push(id);
            cells.insert(id, cell);
        }

        Ok(Self {
            order,
            cells,
            last_frame: String::new(),
        })
    }

    /// Draws every object with its effective bias. Only frames that differ
    /// from the previous one are logged.
    pub fn render(&mut self, ctx: &GovernorContext) {
        let mut frame = String::new();
        for id in &self.order {
            let (Some(cell), Some(object), Some(bias)) = (
                self.cells.get(id),
                ctx.governor().registry().get(*id),
                ctx.effective_bias(*id),
            ) else {
                continue;
            };
            if !frame.is_empty() {
                frame.push(' ');
            }
            frame.push_str(&format!(
                "[{},{}]{}{:.0}={:+.2}",
                cell.column,
                cell.row,
                object.priority().short_name(),
                object.estimated_cost(),
                bias
            ));
        }

        if frame != self.last_frame {
            log::debug!("Scene: {}", frame);
            self.last_frame = frame;
        }
    }
}
