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

//! Integration tests for telemetry selection and watchdog fallback, driven
//! through simulated memory-info counters.

use lodgov_control::{GovernorContext, Settings, TickOutcome};
use lodgov_core::{NativeCounter, ObjectDescriptor, Priority, TelemetryMode, TelemetryReading};
use lodgov_infra::{CounterBehavior, SimulatedVramDevice, VendorCounter};
use lodgov_telemetry::WatchdogVerdict;
use std::sync::Arc;
use std::time::Duration;

const PAD_MB: u64 = 256;

/// Builds a context over a simulated device, returning both.
fn context_over(device: SimulatedVramDevice) -> (GovernorContext, Arc<SimulatedVramDevice>) {
    let device = Arc::new(device);
    let counter = VendorCounter::detect(device.clone()).expect("device advertises a counter");
    let counter: Arc<dyn NativeCounter> = Arc::new(counter);
    let ctx = GovernorContext::new(&Settings::default(), Some(counter)).unwrap();
    (ctx, device)
}

/// Commits one pad on the device, then tells the context about it.
fn allocate_pad(ctx: &mut GovernorContext, device: &SimulatedVramDevice) -> WatchdogVerdict {
    device.commit(PAD_MB);
    ctx.on_allocation_event()
}

// ─────────────────────────────────────────────────────────────────────────────
// Healthy counters
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_live_nvx_counter_stays_native() {
    let (mut ctx, device) = context_over(SimulatedVramDevice::nvx(4096));
    assert_eq!(ctx.telemetry().mode(), TelemetryMode::Native);
    assert_eq!(ctx.telemetry().source().base_free_mb(), 3686);

    assert_eq!(allocate_pad(&mut ctx, &device), WatchdogVerdict::Seeded);
    assert_eq!(
        allocate_pad(&mut ctx, &device),
        WatchdogVerdict::Moved { delta_mb: 256 }
    );
    assert_eq!(
        allocate_pad(&mut ctx, &device),
        WatchdogVerdict::Moved { delta_mb: 256 }
    );

    assert_eq!(ctx.telemetry().mode(), TelemetryMode::Native);
    ctx.frame(Duration::ZERO);
    assert_eq!(ctx.last_reading(), Some(TelemetryReading::counter(4096 - 768)));
}

#[test]
fn test_ati_counter_without_total_uses_fallback_base() {
    let (mut ctx, device) = context_over(SimulatedVramDevice::ati(3000));
    assert_eq!(ctx.telemetry().source().base_free_mb(), 6000);

    device.commit(1000);
    ctx.frame(Duration::ZERO);
    assert_eq!(ctx.last_reading(), Some(TelemetryReading::counter(2000)));
}

#[test]
fn test_native_pressure_drives_governor() {
    let (mut ctx, device) = context_over(SimulatedVramDevice::nvx(2048));
    let low = ctx
        .spawn_object(ObjectDescriptor::new(Priority::Low, 100.0))
        .unwrap();
    let high = ctx
        .spawn_object(ObjectDescriptor::new(Priority::High, 100.0))
        .unwrap();

    assert_eq!(ctx.frame(Duration::ZERO), TickOutcome::Seeded);
    for _ in 0..5 {
        allocate_pad(&mut ctx, &device);
    }

    match ctx.frame(Duration::from_millis(250)) {
        TickOutcome::Evaluated(report) => {
            assert_eq!(report.reading, TelemetryReading::counter(768));
            assert!(report.spike);
        }
        other => panic!("expected an evaluation, got {other:?}"),
    }
    assert_eq!(ctx.bias(low), Some(1.75));
    assert_eq!(ctx.bias(high), Some(0.5));
}

// ─────────────────────────────────────────────────────────────────────────────
// Broken counters
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_frozen_counter_is_demoted_and_stays_synthetic() {
    let device = SimulatedVramDevice::nvx(4096);
    device.set_behavior(CounterBehavior::Frozen);
    let (mut ctx, device) = context_over(device);

    assert_eq!(allocate_pad(&mut ctx, &device), WatchdogVerdict::Seeded);
    assert_eq!(
        allocate_pad(&mut ctx, &device),
        WatchdogVerdict::Stalled {
            delta_mb: 0,
            strikes: 1
        }
    );
    assert_eq!(allocate_pad(&mut ctx, &device), WatchdogVerdict::Demoted);
    assert_eq!(ctx.telemetry().mode(), TelemetryMode::Synthetic);

    // Counter unfreezes, but the source keeps estimating until told otherwise.
    device.set_behavior(CounterBehavior::Live);
    assert_eq!(allocate_pad(&mut ctx, &device), WatchdogVerdict::Inactive);
    ctx.frame(Duration::ZERO);
    assert_eq!(
        ctx.last_reading(),
        Some(TelemetryReading::synthetic(3686 - 4 * 256))
    );
    assert!(!ctx.last_reading().unwrap().valid);
}

#[test]
fn test_operator_can_restore_native_after_demotion() {
    let device = SimulatedVramDevice::nvx(4096);
    device.set_behavior(CounterBehavior::Frozen);
    let (mut ctx, device) = context_over(device);
    for _ in 0..3 {
        allocate_pad(&mut ctx, &device);
    }
    assert_eq!(ctx.telemetry().mode(), TelemetryMode::Synthetic);

    device.set_behavior(CounterBehavior::Live);
    assert_eq!(ctx.set_telemetry_mode(true), TelemetryMode::Native);
    assert_eq!(ctx.telemetry().watchdog().strikes(), 0);
    assert_eq!(allocate_pad(&mut ctx, &device), WatchdogVerdict::Seeded);
    assert_eq!(
        allocate_pad(&mut ctx, &device),
        WatchdogVerdict::Moved { delta_mb: 256 }
    );
}

#[test]
fn test_failing_counter_reads_estimate_without_strikes() {
    let device = SimulatedVramDevice::nvx(4096);
    device.set_behavior(CounterBehavior::Failing);
    let (mut ctx, device) = context_over(device);

    for _ in 0..4 {
        assert_eq!(
            allocate_pad(&mut ctx, &device),
            WatchdogVerdict::SkippedInvalid
        );
    }
    assert_eq!(ctx.telemetry().mode(), TelemetryMode::Native);
    ctx.frame(Duration::ZERO);
    assert_eq!(
        ctx.last_reading(),
        Some(TelemetryReading::synthetic(3686 - 1024))
    );
}

#[test]
fn test_no_counter_cannot_go_native() {
    let mut ctx = GovernorContext::new(&Settings::default(), None).unwrap();
    assert_eq!(ctx.telemetry().mode(), TelemetryMode::Synthetic);
    assert_eq!(ctx.telemetry().source().base_free_mb(), 6000);
    assert_eq!(ctx.set_telemetry_mode(true), TelemetryMode::Synthetic);
    assert_eq!(ctx.toggle_telemetry(), TelemetryMode::Synthetic);
    assert_eq!(ctx.on_allocation_event(), WatchdogVerdict::Inactive);
}
