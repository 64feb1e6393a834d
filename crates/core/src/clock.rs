// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for deterministic time in tests.
//!
//! The runtime needs two notions of time: a monotonic [`Instant`] for timer
//! deadlines and a wall clock for time triggers and persisted timestamps.
//! [`FakeClock`] advances both together.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of monotonic and wall-clock time.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic time, used for timer deadlines.
    fn now(&self) -> Instant;

    /// Wall-clock time in UTC, used for time triggers.
    fn utc_now(&self) -> DateTime<Utc>;

    /// Wall-clock time as epoch milliseconds, used for persisted timestamps.
    fn epoch_ms(&self) -> u64 {
        self.utc_now().timestamp_millis().max(0) as u64
    }
}

/// Real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

#[derive(Debug)]
struct FakeTime {
    instant: Instant,
    wall: DateTime<Utc>,
}

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeTime>>,
}

/// Default wall-clock start for fake clocks: 2026-01-01T00:00:00Z.
const FAKE_EPOCH_MS: i64 = 1_767_225_600_000;

impl FakeClock {
    pub fn new() -> Self {
        Self::at(DateTime::from_timestamp_millis(FAKE_EPOCH_MS).unwrap_or_default())
    }

    /// Create a fake clock whose wall time starts at `wall`.
    pub fn at(wall: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeTime {
                instant: Instant::now(),
                wall,
            })),
        }
    }

    /// Move both monotonic and wall-clock time forward.
    pub fn advance(&self, by: Duration) {
        let mut time = self.inner.lock();
        time.instant += by;
        time.wall += chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.lock().instant
    }

    fn utc_now(&self) -> DateTime<Utc> {
        self.inner.lock().wall
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
