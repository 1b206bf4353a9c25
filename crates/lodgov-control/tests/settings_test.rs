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

//! Integration tests for loading RON settings files from disk.

use lodgov_control::{GovernorContext, Settings};
use lodgov_core::{GovernorError, TelemetryMode};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_settings(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_settings_file_into_context() {
    let file = write_settings(
        r#"(
    governor: (
        target_free_mb: 1536,
        step_budget_per_tick: 8,
    ),
    telemetry: (
        base_free_mb: Some(1500),
        allocation_block_mb: 128,
    ),
)"#,
    );

    let settings = Settings::load(file.path()).unwrap();
    assert_eq!(settings.governor.target_free_mb, 1536);
    assert_eq!(settings.governor.step_budget_per_tick, 8);
    assert_eq!(settings.governor.hysteresis_mb, 128);
    assert_eq!(settings.telemetry.base_free_mb, Some(1500));

    let mut ctx = GovernorContext::new(&settings, None).unwrap();
    assert_eq!(ctx.telemetry().mode(), TelemetryMode::Synthetic);
    ctx.on_allocation_event();
    assert_eq!(ctx.telemetry().read().free_mb, 1500 - 128);
}

#[test]
fn test_saved_settings_load_back() {
    let mut settings = Settings::default();
    settings.governor.nudge_limit = 2.0;
    settings.telemetry.consecutive_failures = 3;

    let file = write_settings(&settings.to_ron_string().unwrap());
    assert_eq!(Settings::load(file.path()).unwrap(), settings);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Settings::load(dir.path().join("absent.ron"));
    assert!(matches!(result, Err(GovernorError::Io(_))));
}

#[test]
fn test_contradictory_file_rejected() {
    let file = write_settings("(governor: (target_free_mb: 64, min_target_free_mb: 128))");
    assert!(matches!(
        Settings::load(file.path()),
        Err(GovernorError::InvalidConfig { .. })
    ));
}
