// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{TimeZone, Timelike};

#[test]
fn fake_clock_advances_both_clocks() {
    let clock = FakeClock::new();
    let start_instant = clock.now();
    let start_ms = clock.epoch_ms();

    clock.advance(Duration::from_secs(90));

    assert_eq!(clock.now() - start_instant, Duration::from_secs(90));
    assert_eq!(clock.epoch_ms() - start_ms, 90_000);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::new();
    let other = clock.clone();
    clock.advance(Duration::from_secs(5));
    assert_eq!(clock.now(), other.now());
    assert_eq!(clock.utc_now(), other.utc_now());
}

#[test]
fn fake_clock_at_starts_at_given_wall_time() {
    let wall = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 59).unwrap();
    let clock = FakeClock::at(wall);
    clock.advance(Duration::from_secs(1));
    assert_eq!(clock.utc_now().minute(), 1);
    assert_eq!(clock.utc_now().second(), 0);
}

#[test]
fn system_clock_epoch_is_recent() {
    // 2024-01-01 as a floor
    assert!(SystemClock.epoch_ms() > 1_704_067_200_000);
}
