// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch rejection, persistence failures, and failure isolation

use super::*;

#[tokio::test]
async fn dispatch_rejection_fails_the_task() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;
    ctx.actions.reject_next("no capacity");

    ctx.fire("push").await;

    let tasks = ctx.stored_for("build").await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, TaskStatus::Failed);
    assert!(tasks[0]
        .error
        .as_deref()
        .is_some_and(|e| e.contains("no capacity")));
    assert!(ctx.live_for("build").is_empty());
    assert!(!ctx.runtime.scheduler().has_timers());
}

#[tokio::test]
async fn rejection_is_isolated_to_one_task() {
    let mut ctx = setup();
    ctx.define(command_job("a", "push")).await;
    ctx.define(command_job("b", "push")).await;
    ctx.actions.reject_next("no capacity");

    ctx.fire("push").await;

    let failed = ctx.stored_for("a").await;
    assert_eq!(failed[0].status, TaskStatus::Failed);
    let running = ctx.live_for("b");
    assert_eq!(running.len(), 1);
    assert_eq!(ctx.status(&running[0]), Some(TaskStatus::Running));

    // The loop keeps going for everyone
    ctx.complete_last().await;
    assert_eq!(ctx.stored_for("b").await[0].status, TaskStatus::Done);
    ctx.fire("push").await;
    assert_eq!(ctx.live_for("a").len(), 1);
}

#[tokio::test]
async fn rejected_later_step_fails_task() {
    let mut ctx = setup();
    ctx.define(multi_step_job("pipe", "push", 2)).await;
    let id = start_one(&mut ctx, "pipe").await;
    ctx.actions.reject_next("executor gone");

    ctx.complete_last().await;

    let stored = ctx.stored(&id).await;
    assert_eq!(stored.status, TaskStatus::Failed);
    assert_eq!(stored.results.len(), 2);
}

#[tokio::test]
async fn transient_write_failures_are_retried() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;
    ctx.tasks.fail_next(2);

    let id = start_one(&mut ctx, "build").await;

    assert_eq!(ctx.status(&id), Some(TaskStatus::Running));
    assert_eq!(ctx.tasks.write_attempts(), 3);
    assert_eq!(ctx.dispatched().len(), 1);
    assert!(ctx.notifier.calls().is_empty());
}

#[tokio::test]
async fn exhausted_retries_fail_task_and_alert() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;
    ctx.tasks.fail_always(true);

    ctx.fire("push").await;

    // Three attempts plus the best-effort failed-state write
    assert_eq!(ctx.tasks.write_attempts(), 4);
    assert!(ctx.dispatched().is_empty(), "nothing runs for unstored state");
    assert!(ctx.live_for("build").is_empty());

    let alerts = ctx.notifier.calls();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].task_id.as_deref(), Some("run-1"));
    assert!(alerts[0].message.contains("forced to failed"));
}

#[tokio::test]
async fn exhausted_retries_mid_run_stop_in_flight_work() {
    let mut ctx = setup();
    ctx.define(multi_step_job("pipe", "push", 2)).await;
    start_one(&mut ctx, "pipe").await;

    // Step 1 is still running when its next write fails for good
    ctx.tasks.fail_always(true);
    ctx.advance(Duration::from_secs(11)).await;

    assert_eq!(ctx.notifier.calls().len(), 1);
    assert_eq!(ctx.actions.cancelled().len(), 1);
    assert!(ctx.live_for("pipe").is_empty());
}

#[tokio::test]
async fn stored_failure_survives_after_store_recovers() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;
    let id = start_one(&mut ctx, "build").await;

    ctx.tasks.fail_next(3);
    ctx.complete_last().await;

    // The retries ran out, the forced failure then went through
    let stored = ctx.stored(&id).await;
    assert_eq!(stored.status, TaskStatus::Failed);
    assert!(stored
        .error
        .as_deref()
        .is_some_and(|e| e.contains("could not be persisted")));
}

#[tokio::test]
async fn failing_notifier_does_not_stop_the_loop() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;
    ctx.notifier.set_failing(true);
    ctx.tasks.fail_always(true);
    ctx.fire("push").await;

    ctx.tasks.fail_always(false);
    let id = start_one(&mut ctx, "build").await;

    assert_eq!(ctx.status(&id), Some(TaskStatus::Running));
}
