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

//! Detection of native counters that stop moving.
//!
//! Some drivers expose a memory counter that never changes, or only updates
//! lazily. After an allocation of known size the counter must drop by at
//! least `min_expected_delta_mb`; when it fails to do so on consecutive
//! checks, the source is demoted to the synthetic estimate.

use crate::config::TelemetryConfig;
use crate::source::TelemetrySource;
use lodgov_core::TelemetryMode;

/// Outcome of a single watchdog check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogVerdict {
    /// The source is already synthetic; nothing was checked.
    Inactive,
    /// The reading was not from the counter and was ignored.
    SkippedInvalid,
    /// First valid post-allocation reading; stored as the reference.
    Seeded,
    /// The counter dropped by at least the expected amount.
    Moved {
        /// Observed drop in MB.
        delta_mb: i64,
    },
    /// The counter did not drop enough; one more strike.
    Stalled {
        /// Observed drop in MB.
        delta_mb: i64,
        /// Consecutive stalls so far.
        strikes: u32,
    },
    /// Too many consecutive stalls; the source is now synthetic.
    Demoted,
}

/// Watches post-allocation readings and demotes a frozen counter.
#[derive(Debug, Clone)]
pub struct TelemetryWatchdog {
    last_mb: Option<u32>,
    strikes: u32,
    min_expected_delta_mb: i64,
    consecutive_failures: u32,
}

impl TelemetryWatchdog {
    /// Creates a watchdog from the telemetry configuration.
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            last_mb: None,
            strikes: 0,
            min_expected_delta_mb: i64::from(config.min_expected_delta_mb),
            consecutive_failures: config.consecutive_failures.max(1),
        }
    }

    /// Checks the counter after a known allocation.
    ///
    /// Must be called after the allocation has been committed so that the
    /// reading reflects it.
    pub fn on_allocation_event(&mut self, source: &mut TelemetrySource) -> WatchdogVerdict {
        if source.mode() == TelemetryMode::Synthetic {
            return WatchdogVerdict::Inactive;
        }

        let reading = source.read();
        if !reading.valid {
            return WatchdogVerdict::SkippedInvalid;
        }

        let Some(last_mb) = self.last_mb.replace(reading.free_mb) else {
            log::debug!("Watchdog: reference reading {} MB", reading.free_mb);
            return WatchdogVerdict::Seeded;
        };

        let delta_mb = i64::from(last_mb) - i64::from(reading.free_mb);
        if delta_mb >= self.min_expected_delta_mb {
            self.strikes = 0;
            return WatchdogVerdict::Moved { delta_mb };
        }

        self.strikes += 1;
        log::debug!(
            "Watchdog: counter moved {} MB (expected >= {}), strike {}/{}",
            delta_mb,
            self.min_expected_delta_mb,
            self.strikes,
            self.consecutive_failures
        );
        if self.strikes >= self.consecutive_failures {
            log::warn!("Watchdog: telemetry frozen -> FALLBACK");
            source.demote();
            self.reset();
            return WatchdogVerdict::Demoted;
        }
        WatchdogVerdict::Stalled {
            delta_mb,
            strikes: self.strikes,
        }
    }

    /// Forgets the reference reading and any strikes.
    pub fn reset(&mut self) {
        self.last_mb = None;
        self.strikes = 0;
    }

    /// Consecutive stalls recorded so far.
    pub fn strikes(&self) -> u32 {
        self.strikes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodgov_core::{CounterError, NativeCounter};
    use std::borrow::Cow;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct MovableCounter {
        free_kb: AtomicI64,
    }

    impl MovableCounter {
        fn set_mb(&self, mb: i64) {
            self.free_kb.store(mb * 1024, Ordering::Relaxed);
        }
    }

    impl NativeCounter for MovableCounter {
        fn label(&self) -> Cow<'static, str> {
            Cow::Borrowed("movable")
        }

        fn query_free_kb(&self) -> Result<i64, CounterError> {
            Ok(self.free_kb.load(Ordering::Relaxed))
        }
    }

    fn setup(initial_mb: i64) -> (Arc<MovableCounter>, TelemetrySource, TelemetryWatchdog) {
        let counter = Arc::new(MovableCounter {
            free_kb: AtomicI64::new(initial_mb * 1024),
        });
        let config = TelemetryConfig::default();
        let source = TelemetrySource::new(Some(counter.clone()), &config);
        (counter, source, TelemetryWatchdog::new(&config))
    }

    #[test]
    fn test_first_check_seeds() {
        let (_counter, mut source, mut watchdog) = setup(4000);
        assert_eq!(watchdog.on_allocation_event(&mut source), WatchdogVerdict::Seeded);
    }

    #[test]
    fn test_moving_counter_never_demoted() {
        let (counter, mut source, mut watchdog) = setup(4000);
        watchdog.on_allocation_event(&mut source);
        for step in 1..=5 {
            counter.set_mb(4000 - step * 256);
            assert_eq!(
                watchdog.on_allocation_event(&mut source),
                WatchdogVerdict::Moved { delta_mb: 256 }
            );
        }
        assert_eq!(source.mode(), TelemetryMode::Native);
    }

    #[test]
    fn test_two_consecutive_stalls_demote() {
        let (_counter, mut source, mut watchdog) = setup(4000);
        watchdog.on_allocation_event(&mut source);
        assert_eq!(
            watchdog.on_allocation_event(&mut source),
            WatchdogVerdict::Stalled {
                delta_mb: 0,
                strikes: 1
            }
        );
        assert_eq!(watchdog.on_allocation_event(&mut source), WatchdogVerdict::Demoted);
        assert_eq!(source.mode(), TelemetryMode::Synthetic);
        assert_eq!(watchdog.strikes(), 0);

        // Stays synthetic and the watchdog fails open from now on.
        assert!(!source.read().valid);
        assert_eq!(watchdog.on_allocation_event(&mut source), WatchdogVerdict::Inactive);
    }

    #[test]
    fn test_single_stall_is_forgiven() {
        let (counter, mut source, mut watchdog) = setup(4000);
        watchdog.on_allocation_event(&mut source);

        counter.set_mb(3950); // lagging counter
        assert!(matches!(
            watchdog.on_allocation_event(&mut source),
            WatchdogVerdict::Stalled { strikes: 1, .. }
        ));

        counter.set_mb(3600);
        assert_eq!(
            watchdog.on_allocation_event(&mut source),
            WatchdogVerdict::Moved { delta_mb: 350 }
        );

        counter.set_mb(3590);
        assert!(matches!(
            watchdog.on_allocation_event(&mut source),
            WatchdogVerdict::Stalled { strikes: 1, .. }
        ));
        assert_eq!(source.mode(), TelemetryMode::Native);
    }

    #[test]
    fn test_invalid_reading_skipped_without_strike() {
        let (counter, mut source, mut watchdog) = setup(4000);
        watchdog.on_allocation_event(&mut source);

        counter.set_mb(0);
        assert_eq!(
            watchdog.on_allocation_event(&mut source),
            WatchdogVerdict::SkippedInvalid
        );
        assert_eq!(watchdog.strikes(), 0);
    }

    #[test]
    fn test_inactive_when_synthetic() {
        let mut source = TelemetrySource::synthetic(2048);
        let mut watchdog = TelemetryWatchdog::new(&TelemetryConfig::default());
        assert_eq!(watchdog.on_allocation_event(&mut source), WatchdogVerdict::Inactive);
    }
}
