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

//! Integration tests for the governor control loop: band escalation and
//! recovery, the spike tourniquet, rate limiting, and operator resets.

use lodgov_control::{BandState, Governor, GovernorConfig, TickOutcome};
use lodgov_core::{ObjectDescriptor, ObjectId, Priority, TelemetryReading};
use std::time::Duration;

/// Evaluation `n` of a session spaced exactly one eval interval apart.
fn at(n: u32) -> Duration {
    Duration::from_millis(250 * u64::from(n))
}

fn reading(free_mb: u32) -> TelemetryReading {
    TelemetryReading::counter(free_mb)
}

fn spawn_all(governor: &mut Governor, specs: &[(Priority, f32)]) -> Vec<ObjectId> {
    specs
        .iter()
        .map(|&(p, cost)| governor.spawn_object(ObjectDescriptor::new(p, cost)).unwrap())
        .collect()
}

fn biases(governor: &Governor, ids: &[ObjectId]) -> Vec<f32> {
    ids.iter().map(|id| governor.bias(*id).unwrap()).collect()
}

fn expect_report(outcome: TickOutcome) -> lodgov_control::EvaluationReport {
    match outcome {
        TickOutcome::Evaluated(report) => report,
        other => panic!("expected an evaluation, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reference scenario
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_reference_scenario_three_normal_objects() {
    let mut governor = Governor::new(GovernorConfig::default()).unwrap();
    let ids = spawn_all(
        &mut governor,
        &[
            (Priority::Normal, 100.0),
            (Priority::Normal, 100.0),
            (Priority::Normal, 100.0),
        ],
    );

    assert_eq!(governor.tick(at(0), reading(1024)), TickOutcome::Seeded);
    assert_eq!(biases(&governor, &ids), vec![0.0; 3]);

    let second = expect_report(governor.tick(at(1), reading(1024)));
    assert_eq!(second.band, BandState::Within);
    assert_eq!(biases(&governor, &ids), vec![0.0; 3]);

    let third = expect_report(governor.tick(at(2), reading(700)));
    assert_eq!(third.band, BandState::Below);
    assert_eq!(third.gradual_steps, 3);
    assert_eq!(biases(&governor, &ids), vec![0.5; 3]);

    let fourth = expect_report(governor.tick(at(3), reading(700)));
    assert_eq!(fourth.delta_mb, 0);
    assert!(!fourth.spike);
    assert_eq!(biases(&governor, &ids), vec![1.0; 3]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Band rule
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_escalation_fills_low_bucket_before_normal() {
    let mut governor = Governor::new(GovernorConfig::default()).unwrap();
    let low = spawn_all(
        &mut governor,
        &[
            (Priority::Low, 100.0),
            (Priority::Low, 300.0),
            (Priority::Low, 200.0),
        ],
    );
    let normal = spawn_all(
        &mut governor,
        &[
            (Priority::Normal, 200.0),
            (Priority::Normal, 300.0),
            (Priority::Normal, 100.0),
        ],
    );
    let high = spawn_all(&mut governor, &[(Priority::High, 500.0)]);

    governor.tick(at(0), reading(880));
    let report = expect_report(governor.tick(at(1), reading(860)));
    assert!(!report.spike);
    assert_eq!(report.gradual_steps, 4);

    assert_eq!(biases(&governor, &low), vec![0.5, 0.5, 0.5]);
    // Budget left for one Normal object: the most expensive one.
    assert_eq!(biases(&governor, &normal), vec![0.0, 0.5, 0.0]);
    assert_eq!(biases(&governor, &high), vec![0.0]);
}

#[test]
fn test_recovery_restores_high_bucket_first() {
    let config = GovernorConfig {
        step_budget_per_tick: 2,
        ..Default::default()
    };
    let mut governor = Governor::new(config).unwrap();
    let ids: Vec<ObjectId> = Priority::ALL
        .iter()
        .map(|&p| {
            governor
                .spawn_object(ObjectDescriptor::new(p, 100.0).with_bounds(0.0, 0.5))
                .unwrap()
        })
        .collect();

    governor.tick(at(0), reading(880));
    governor.tick(at(1), reading(870));
    assert_eq!(biases(&governor, &ids), vec![0.5, 0.5, 0.0]);
    // Low and Normal are pinned and cost nothing, so High gets the budget.
    governor.tick(at(2), reading(860));
    assert_eq!(biases(&governor, &ids), vec![0.5, 0.5, 0.5]);

    let report = expect_report(governor.tick(at(3), reading(1200)));
    assert_eq!(report.band, BandState::Above);
    assert_eq!(report.gradual_steps, 2);
    assert_eq!(biases(&governor, &ids), vec![0.5, 0.0, 0.0]);
}

#[test]
fn test_deadband_leaves_biases_alone() {
    let mut governor = Governor::new(GovernorConfig::default()).unwrap();
    let ids = spawn_all(
        &mut governor,
        &[(Priority::Low, 10.0), (Priority::Normal, 10.0)],
    );

    governor.tick(at(0), reading(880));
    governor.tick(at(1), reading(800));
    let raised = biases(&governor, &ids);
    assert_eq!(raised, vec![0.5, 0.5]);

    for (n, free) in [1000, 1100, 950, 896, 1152, 1024].into_iter().enumerate() {
        let report = expect_report(governor.tick(at(2 + n as u32), reading(free)));
        assert_eq!(report.band, BandState::Within);
        assert_eq!(report.gradual_steps, 0);
        assert_eq!(biases(&governor, &ids), raised);
    }
}

#[test]
fn test_escalation_clamps_at_bias_max() {
    let mut governor = Governor::new(GovernorConfig::default()).unwrap();
    let id = governor
        .spawn_object(ObjectDescriptor::new(Priority::Low, 50.0).with_bounds(0.0, 1.0))
        .unwrap();

    governor.tick(at(0), reading(600));
    for n in 1..6 {
        governor.tick(at(n), reading(600));
    }
    assert_eq!(governor.bias(id), Some(1.0));

    let report = governor.last_report().unwrap();
    assert_eq!(report.gradual_steps, 0, "pinned objects cost no budget");
}

// ─────────────────────────────────────────────────────────────────────────────
// Spike tourniquet
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_spike_inside_band_touches_only_low_bucket() {
    let mut governor = Governor::new(GovernorConfig::default()).unwrap();
    let ids = spawn_all(
        &mut governor,
        &[
            (Priority::Low, 10.0),
            (Priority::Normal, 10.0),
            (Priority::High, 10.0),
        ],
    );

    governor.tick(at(0), reading(1400));
    let report = expect_report(governor.tick(at(1), reading(1100)));
    assert!(report.spike);
    assert_eq!(report.band, BandState::Within);
    assert_eq!(report.spike_steps, 1);
    assert_eq!(report.gradual_steps, 0);
    assert_eq!(biases(&governor, &ids), vec![1.25, 0.0, 0.0]);
}

#[test]
fn test_spike_then_band_in_same_evaluation() {
    let mut governor = Governor::new(GovernorConfig::default()).unwrap();
    let ids = spawn_all(
        &mut governor,
        &[
            (Priority::Low, 10.0),
            (Priority::Normal, 10.0),
            (Priority::High, 10.0),
        ],
    );

    governor.tick(at(0), reading(1024));
    let report = expect_report(governor.tick(at(1), reading(700)));
    assert!(report.spike);
    assert_eq!(report.spike_steps, 1);
    assert_eq!(report.gradual_steps, 3);
    assert_eq!(biases(&governor, &ids), vec![1.75, 0.5, 0.5]);
}

#[test]
fn test_drop_just_under_threshold_is_not_a_spike() {
    let mut governor = Governor::new(GovernorConfig::default()).unwrap();
    let ids = spawn_all(&mut governor, &[(Priority::Low, 10.0)]);

    governor.tick(at(0), reading(1400));
    let report = expect_report(governor.tick(at(1), reading(1145)));
    assert!(!report.spike);
    assert_eq!(biases(&governor, &ids), vec![0.0]);

    let report = expect_report(governor.tick(at(2), reading(889)));
    assert!(report.spike, "a drop of exactly the threshold fires");
}

// ─────────────────────────────────────────────────────────────────────────────
// Rate limiting and operator controls
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_ticks_inside_interval_change_nothing() {
    let mut governor = Governor::new(GovernorConfig::default()).unwrap();
    let ids = spawn_all(&mut governor, &[(Priority::Low, 10.0), (Priority::High, 10.0)]);

    governor.tick(at(0), reading(1024));
    governor.tick(at(1), reading(700));
    let before = biases(&governor, &ids);

    for ms in [260, 300, 400, 499] {
        let outcome = governor.tick(Duration::from_millis(ms), reading(10));
        assert_eq!(outcome, TickOutcome::RateLimited);
        assert_eq!(biases(&governor, &ids), before);
    }
    assert_eq!(governor.last_free_mb(), Some(700));
}

#[test]
fn test_reset_restores_rest_state_and_reseeds() {
    let mut governor = Governor::new(GovernorConfig::default()).unwrap();
    let ids = spawn_all(&mut governor, &[(Priority::Low, 10.0), (Priority::Normal, 10.0)]);
    let shifted = governor
        .spawn_object(ObjectDescriptor::new(Priority::High, 10.0).with_bounds(1.0, 3.0))
        .unwrap();

    governor.tick(at(0), reading(1024));
    governor.tick(at(1), reading(600));
    governor.nudge(1.0);
    assert_ne!(biases(&governor, &ids), vec![0.0, 0.0]);

    governor.reset();
    assert_eq!(biases(&governor, &ids), vec![0.0, 0.0]);
    assert_eq!(governor.bias(shifted), Some(1.0));
    assert_eq!(governor.global_nudge(), 0.0);
    assert_eq!(governor.last_free_mb(), None);
    assert_eq!(governor.tick(at(2), reading(600)), TickOutcome::Seeded);
}

#[test]
fn test_paused_governor_ignores_pressure() {
    let mut governor = Governor::new(GovernorConfig::default()).unwrap();
    let ids = spawn_all(&mut governor, &[(Priority::Low, 10.0)]);

    governor.tick(at(0), reading(1024));
    governor.set_enabled(false);
    assert_eq!(governor.tick(at(1), reading(100)), TickOutcome::Disabled);
    assert_eq!(biases(&governor, &ids), vec![0.0]);

    governor.set_enabled(true);
    assert_eq!(governor.tick(at(2), reading(100)), TickOutcome::Seeded);
    let report = expect_report(governor.tick(at(3), reading(100)));
    assert!(!report.spike, "resuming must not diff against pre-pause data");
}

#[test]
fn test_target_adjustment_moves_band() {
    let mut governor = Governor::new(GovernorConfig::default()).unwrap();
    let ids = spawn_all(&mut governor, &[(Priority::Low, 10.0)]);

    governor.tick(at(0), reading(1000));
    assert_eq!(governor.adjust_target(256), 1280);
    let report = expect_report(governor.tick(at(1), reading(1000)));
    assert_eq!(report.band, BandState::Below);
    assert_eq!(biases(&governor, &ids), vec![0.5]);

    assert_eq!(governor.adjust_target(-10_000), 128);
    let report = expect_report(governor.tick(at(2), reading(1000)));
    assert_eq!(report.band, BandState::Above);
    assert_eq!(biases(&governor, &ids), vec![0.0]);
}

#[test]
fn test_despawned_object_is_skipped() {
    let mut governor = Governor::new(GovernorConfig::default()).unwrap();
    let ids = spawn_all(&mut governor, &[(Priority::Low, 10.0), (Priority::Low, 5.0)]);

    governor.tick(at(0), reading(800));
    governor.despawn_object(ids[0]).unwrap();
    let report = expect_report(governor.tick(at(1), reading(790)));
    assert_eq!(report.gradual_steps, 1);
    assert_eq!(governor.bias(ids[0]), None);
    assert_eq!(governor.bias(ids[1]), Some(0.5));
    assert!(governor.despawn_object(ids[0]).is_err());
}
