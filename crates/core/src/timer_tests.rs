// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn task_timers_are_distinct() {
    let task = TaskId::new("run-1");
    assert_eq!(TimerId::step_timeout(&task), "step-timeout:run-1");
    assert_eq!(TimerId::wait_deadline(&task), "wait-deadline:run-1");
    assert_ne!(TimerId::step_timeout(&task), TimerId::wait_deadline(&task));
}

#[yare::parameterized(
    step    = { "step-timeout:run-1",  Some((TimerKind::StepTimeout, "run-1")) },
    wait    = { "wait-deadline:abc",   Some((TimerKind::WaitDeadline, "abc")) },
    nested  = { "step-timeout:a:b",    Some((TimerKind::StepTimeout, "a:b")) },
    foreign = { "cron:nightly",        None },
    bare    = { "step-timeout",        None },
)]
fn parse(raw: &str, expected: Option<(TimerKind, &str)>) {
    let parsed = TimerId::from(raw).parse();
    let expected = expected.map(|(k, id)| (k, TaskId::new(id)));
    assert_eq!(parsed, expected);
}

#[test]
fn display_is_raw_string() {
    assert_eq!(
        TimerId::wait_deadline(&TaskId::new("x")).to_string(),
        "wait-deadline:x"
    );
}
