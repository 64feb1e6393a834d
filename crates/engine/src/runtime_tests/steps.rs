// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step progression: completions, failures, and step deadlines

use super::*;
use tally_adapters::ActionHandle;
use tally_core::StepOutcome;

#[tokio::test]
async fn single_step_success_is_done() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;
    let id = start_one(&mut ctx, "build").await;

    ctx.complete_last().await;

    assert_eq!(ctx.status(&id), None, "finished tasks leave the live set");
    let stored = ctx.stored(&id).await;
    assert_eq!(stored.status, TaskStatus::Done);
    assert_eq!(stored.results.len(), 1);
    assert_eq!(stored.results[0].outcome, StepOutcome::Completed);
    assert!(!ctx.runtime.scheduler().has_timers());
}

#[tokio::test]
async fn steps_run_in_order() {
    let mut ctx = setup();
    ctx.define(multi_step_job("pipe", "push", 3)).await;
    let id = start_one(&mut ctx, "pipe").await;

    for expected in 1..=2 {
        ctx.complete_last().await;
        assert_eq!(ctx.status(&id), Some(TaskStatus::Running));
        assert_eq!(ctx.stored(&id).await.step, expected);
    }
    ctx.complete_last().await;

    let steps: Vec<usize> = ctx.dispatched().iter().map(|r| r.step).collect();
    assert_eq!(steps, vec![0, 1, 2]);
    let stored = ctx.stored(&id).await;
    assert_eq!(stored.status, TaskStatus::Done);
    let names: Vec<&str> = stored.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["s1", "s2", "s3"]);
}

#[tokio::test]
async fn action_failure_fails_task() {
    let mut ctx = setup();
    ctx.define(multi_step_job("pipe", "push", 2)).await;
    let id = start_one(&mut ctx, "pipe").await;

    let handle = ctx.actions.last_handle().unwrap();
    ctx.complete(&handle, false).await;

    let stored = ctx.stored(&id).await;
    assert_eq!(stored.status, TaskStatus::Failed);
    assert_eq!(stored.error.as_deref(), Some("exit status 1"));
    assert_eq!(ctx.dispatched().len(), 1, "later steps never run");
    assert!(!ctx.runtime.scheduler().has_timers());
}

#[tokio::test]
async fn finish_emits_lifecycle_event() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;
    start_one(&mut ctx, "build").await;
    ctx.event_kinds();

    ctx.complete_last().await;

    assert!(ctx.event_kinds().iter().any(|k| k == kinds::TASK_FINISHED));
}

#[tokio::test]
async fn completion_for_unknown_handle_is_ignored() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;
    let id = start_one(&mut ctx, "build").await;

    ctx.complete(&ActionHandle::new("h-99"), true).await;

    assert_eq!(ctx.status(&id), Some(TaskStatus::Running));
}

#[tokio::test]
async fn duplicate_completion_is_ignored() {
    let mut ctx = setup();
    ctx.define(multi_step_job("pipe", "push", 2)).await;
    let id = start_one(&mut ctx, "pipe").await;
    let first = ctx.actions.last_handle().unwrap();

    ctx.complete(&first, true).await;
    ctx.complete(&first, true).await;

    assert_eq!(ctx.status(&id), Some(TaskStatus::Running));
    assert_eq!(ctx.stored(&id).await.step, 1);
}

#[tokio::test]
async fn step_timeout_fails_and_cancels_work() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;
    let id = start_one(&mut ctx, "build").await;
    let handle = ctx.actions.last_handle().unwrap();

    ctx.advance(STEP_TIMEOUT - Duration::from_secs(1)).await;
    assert_eq!(ctx.status(&id), Some(TaskStatus::Running));

    ctx.advance(Duration::from_secs(2)).await;

    let stored = ctx.stored(&id).await;
    assert_eq!(stored.status, TaskStatus::Failed);
    assert_eq!(
        stored.error.as_deref(),
        Some("step 'step-1' timed out after 11s")
    );
    assert_eq!(ctx.actions.cancelled(), vec![handle]);
}

#[tokio::test]
async fn late_completion_after_timeout_is_ignored() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;
    let id = start_one(&mut ctx, "build").await;
    let handle = ctx.actions.last_handle().unwrap();

    ctx.advance(Duration::from_secs(11)).await;
    ctx.complete(&handle, true).await;

    assert_eq!(ctx.stored(&id).await.status, TaskStatus::Failed);
}

#[tokio::test]
async fn each_step_gets_a_fresh_deadline() {
    let mut ctx = setup();
    ctx.define(multi_step_job("pipe", "push", 2)).await;
    let id = start_one(&mut ctx, "pipe").await;

    ctx.advance(Duration::from_secs(8)).await;
    ctx.complete_last().await;
    ctx.advance(Duration::from_secs(8)).await;

    assert_eq!(ctx.status(&id), Some(TaskStatus::Running));
}
