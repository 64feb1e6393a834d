// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn missing_trigger() {
    assert_toml_err(
        r#"
        [job.a]
        [[job.a.step]]
        run = "true"
        timeout = "1s"
        "#,
        &["job.a", "requires 'on' or 'schedule'"],
    );
}

#[test]
fn both_triggers() {
    assert_toml_err(
        r#"
        [job.a]
        on = "go"
        schedule = "* * * * *"
        [[job.a.step]]
        run = "true"
        timeout = "1s"
        "#,
        &["job.a", "only one of 'on' or 'schedule'"],
    );
}

#[test]
fn malformed_schedule() {
    let err = parse_jobs(
        r#"
        [job.a]
        schedule = "61 * * * *"
        [[job.a.step]]
        run = "true"
        timeout = "1s"
        "#,
        Format::Toml,
    )
    .unwrap_err();
    assert!(matches!(err, JobFileError::Trigger { .. }));
    assert_err_contains(&err, &["job.a", "minute"]);
}

#[test]
fn step_without_action() {
    assert_toml_err(
        r#"
        [job.a]
        on = "go"
        [[job.a.step]]
        timeout = "1s"
        "#,
        &["job.a.step[0]", "requires 'run' or 'collect'"],
    );
}

#[test]
fn step_with_both_actions() {
    assert_toml_err(
        r#"
        [job.a]
        on = "go"
        [[job.a.step]]
        run = "true"
        collect = {}
        timeout = "1s"
        "#,
        &["only one of 'run' or 'collect'"],
    );
}

#[test]
fn bad_step_timeout() {
    assert_toml_err(
        r#"
        [job.a]
        on = "go"
        [[job.a.step]]
        run = "true"
        timeout = "soon"
        "#,
        &["job.a.step[0].timeout"],
    );
}

#[test]
fn zero_wait_timeout_fails_validation() {
    let err = parse_jobs(
        r#"
        [job.a]
        on = "go"
        [[job.a.step]]
        run = "true"
        timeout = "1s"
        wait = { on = "x", timeout = "0s" }
        "#,
        Format::Toml,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        JobFileError::Validation(ValidationError::ZeroWaitTimeout { .. })
    ));
}

#[test]
fn job_without_steps_fails_validation() {
    let err = parse_jobs(
        r#"
        [job.a]
        on = "go"
        "#,
        Format::Toml,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        JobFileError::Validation(ValidationError::NoSteps { .. })
    ));
}

#[test]
fn syntax_errors_name_the_format() {
    assert_toml_err("[job.a", &["TOML parse error"]);
    let err = parse_jobs("{", Format::Json).unwrap_err();
    assert_err_contains(&err, &["JSON parse error"]);
}
