// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Start triggers, manual starts, and the no-double-start rule

use super::*;
use tally_core::{SurpassBehaviour, TriggerSpec};

#[tokio::test]
async fn event_trigger_starts_and_dispatches_first_step() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;

    let id = start_one(&mut ctx, "build").await;

    assert_eq!(ctx.status(&id), Some(TaskStatus::Running));
    let dispatched = ctx.dispatched();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].task_id, id);
    assert_eq!(dispatched[0].job_id, "build");
    assert_eq!(dispatched[0].step, 0);

    let stored = ctx.stored(&id).await;
    assert_eq!(stored.status, TaskStatus::Running);
    assert!(ctx.runtime.scheduler().is_set(&TimerId::step_timeout(&id)));
}

#[tokio::test]
async fn persisted_before_dispatch() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;
    ctx.event_kinds();

    ctx.fire("push").await;

    let seen = ctx.event_kinds();
    let stored = seen
        .iter()
        .position(|k| k == kinds::TASK_UPDATED_MANY)
        .unwrap();
    let started = seen.iter().position(|k| k == kinds::TASK_STARTED).unwrap();
    assert!(stored < started, "{seen:?}");
    assert_eq!(ctx.dispatched().len(), 1);
}

#[tokio::test]
async fn unrelated_event_starts_nothing() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;

    ctx.fire("pull").await;

    assert!(ctx.live_for("build").is_empty());
    assert!(ctx.dispatched().is_empty());
}

#[tokio::test]
async fn every_matching_job_starts() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;
    ctx.define(command_job("lint", "push")).await;

    ctx.fire("push").await;

    assert_eq!(ctx.live_for("build").len(), 1);
    assert_eq!(ctx.live_for("lint").len(), 1);
}

#[tokio::test]
async fn no_double_start_while_running() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;

    let first = start_one(&mut ctx, "build").await;
    ctx.fire("push").await;
    ctx.fire("push").await;

    assert_eq!(ctx.live_for("build"), vec![first]);
    assert_eq!(ctx.dispatched().len(), 1);
    assert_eq!(ctx.stored_for("build").await.len(), 1);
}

#[tokio::test]
async fn starts_again_after_finish() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;

    let first = start_one(&mut ctx, "build").await;
    ctx.complete_last().await;
    let second = start_one(&mut ctx, "build").await;

    assert_ne!(first, second);
    assert_eq!(ctx.stored(&first).await.status, TaskStatus::Done);
}

#[tokio::test]
async fn concurrency_limit_allows_parallel_runs() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push").with_concurrency(2, SurpassBehaviour::Skip))
        .await;

    for _ in 0..3 {
        ctx.fire("push").await;
    }

    assert_eq!(ctx.live_for("build").len(), 2);
    assert_eq!(ctx.dispatched().len(), 2);
}

#[tokio::test]
async fn inactive_job_is_not_started() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push").with_active(false)).await;

    ctx.fire("push").await;

    assert!(ctx.live_for("build").is_empty());
    let err = ctx.runtime.trigger(&JobId::new("build")).await.unwrap_err();
    assert!(matches!(err, RuntimeError::JobInactive(_)));
}

#[tokio::test]
async fn manual_trigger_respects_policy() {
    let mut ctx = setup();
    ctx.define(command_job("build", "never")).await;
    let job = JobId::new("build");

    let outcome = ctx.runtime.trigger(&job).await.unwrap();
    let StartOutcome::Started(id) = outcome else {
        panic!("expected a start, got {outcome:?}");
    };
    assert_eq!(ctx.status(&id), Some(TaskStatus::Running));

    assert_eq!(
        ctx.runtime.trigger(&job).await.unwrap(),
        StartOutcome::Skipped
    );
}

#[tokio::test]
async fn manual_trigger_of_unknown_job() {
    let mut ctx = setup();
    let err = ctx.runtime.trigger(&JobId::new("ghost")).await.unwrap_err();
    assert!(matches!(err, RuntimeError::JobNotFound(_)));
}

#[tokio::test]
async fn time_trigger_catches_up_missed_seconds() {
    let mut ctx = setup();
    let trigger = TriggerSpec::time("*/10 * * * * *").unwrap();
    let job = JobDescriptor::single("tick", "echo tick", STEP_TIMEOUT, trigger, None)
        .with_concurrency(3, SurpassBehaviour::Skip);
    ctx.define(job).await;

    // One late tick covers :10 and :20
    ctx.advance(Duration::from_secs(25)).await;

    assert_eq!(ctx.live_for("tick").len(), 2);
}

#[tokio::test]
async fn time_trigger_does_not_refire_same_second() {
    let mut ctx = setup();
    let trigger = TriggerSpec::time("*/10 * * * * *").unwrap();
    let job = JobDescriptor::single("tick", "echo tick", STEP_TIMEOUT, trigger, None)
        .with_concurrency(5, SurpassBehaviour::Skip);
    ctx.define(job).await;

    ctx.advance(Duration::from_secs(10)).await;
    ctx.runtime.tick().await;
    ctx.runtime.tick().await;

    assert_eq!(ctx.live_for("tick").len(), 1);
}
