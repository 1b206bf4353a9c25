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

//! Scripted operator and harness actions.

use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    AllocatePad,
    FreePad,
    NudgeUp,
    NudgeDown,
    Reset,
    ToggleTelemetry,
    RaiseTarget,
    LowerTarget,
    ToggleGovernor,
}

/// Actions ordered by the time they fire.
#[derive(Debug)]
pub struct Timeline {
    events: VecDeque<(Duration, Action)>,
}

impl Timeline {
    pub fn new(mut events: Vec<(Duration, Action)>) -> Self {
        events.sort_by_key(|(at, _)| *at);
        Self {
            events: events.into(),
        }
    }

    /// Builds up pressure, recovers, then exercises each operator control.
    pub fn demo() -> Self {
        use Action::*;
        let script = [
            (1.0, AllocatePad),
            (1.5, AllocatePad),
            (2.0, AllocatePad),
            (2.5, AllocatePad),
            (3.0, AllocatePad),
            (4.5, NudgeUp),
            (5.0, FreePad),
            (5.5, FreePad),
            (6.0, FreePad),
            (7.0, NudgeDown),
            (7.5, RaiseTarget),
            (8.5, LowerTarget),
            (9.0, ToggleGovernor),
            (9.5, AllocatePad),
            (10.0, ToggleGovernor),
            (10.5, ToggleTelemetry),
            (11.0, ToggleTelemetry),
            (11.5, Reset),
        ];
        Self::new(
            script
                .into_iter()
                .map(|(secs, action)| (Duration::from_secs_f64(secs), action))
                .collect(),
        )
    }

    /// Pops every action scheduled at or before `now`.
    pub fn due(&mut self, now: Duration) -> Vec<Action> {
        let mut due = Vec::new();
        while let Some((at, action)) = self.events.front().copied() {
            if at > now {
                break;
            }
            self.events.pop_front();
            due.push(action);
        }
        due
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
