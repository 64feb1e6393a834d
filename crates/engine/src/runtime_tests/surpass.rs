// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrency policies: skip, replace, wait

use super::*;
use tally_core::SurpassBehaviour;

fn limited(on_surpass: SurpassBehaviour) -> JobDescriptor {
    command_job("build", "push").with_concurrency(1, on_surpass)
}

#[tokio::test]
async fn skip_drops_the_start() {
    let mut ctx = setup();
    ctx.define(limited(SurpassBehaviour::Skip)).await;
    let first = start_one(&mut ctx, "build").await;

    assert_eq!(
        ctx.runtime.trigger(&JobId::new("build")).await.unwrap(),
        StartOutcome::Skipped
    );
    assert_eq!(ctx.live_for("build"), vec![first]);
}

#[tokio::test]
async fn replace_cancels_oldest_and_starts() {
    let mut ctx = setup();
    ctx.define(limited(SurpassBehaviour::Replace)).await;
    let first = start_one(&mut ctx, "build").await;
    let first_handle = ctx.actions.last_handle().unwrap();

    ctx.clock.advance(Duration::from_secs(1));
    ctx.fire("push").await;

    let live = ctx.live_for("build");
    assert_eq!(live.len(), 1);
    assert_ne!(live[0], first);
    assert_eq!(ctx.status(&live[0]), Some(TaskStatus::Running));
    assert_eq!(ctx.stored(&first).await.status, TaskStatus::Cancelled);
    assert_eq!(ctx.actions.cancelled(), vec![first_handle]);
    assert_eq!(ctx.dispatched().len(), 2);
}

#[tokio::test]
async fn replace_with_room_just_starts() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push").with_concurrency(2, SurpassBehaviour::Replace))
        .await;

    ctx.fire("push").await;
    ctx.fire("push").await;

    assert_eq!(ctx.live_for("build").len(), 2);
    assert!(ctx.actions.cancelled().is_empty());
}

#[tokio::test]
async fn wait_queues_one_start() {
    let mut ctx = setup();
    ctx.define(limited(SurpassBehaviour::Wait)).await;
    let first = start_one(&mut ctx, "build").await;

    let outcome = ctx.runtime.trigger(&JobId::new("build")).await.unwrap();
    let StartOutcome::Queued(queued) = outcome else {
        panic!("expected a queued start, got {outcome:?}");
    };
    assert_eq!(ctx.status(&queued), Some(TaskStatus::Pending));
    assert_eq!(ctx.stored(&queued).await.status, TaskStatus::Pending);

    // A third start while one is queued is dropped
    assert_eq!(
        ctx.runtime.trigger(&JobId::new("build")).await.unwrap(),
        StartOutcome::Skipped
    );
    assert_eq!(ctx.stored_for("build").await.len(), 2);
    assert_eq!(ctx.dispatched().len(), 1);

    ctx.complete_last().await;

    assert_eq!(ctx.stored(&first).await.status, TaskStatus::Done);
    assert_eq!(ctx.status(&queued), Some(TaskStatus::Running));
    let dispatched = ctx.dispatched();
    assert_eq!(dispatched.len(), 2);
    assert_eq!(dispatched[1].task_id, queued);
}

#[tokio::test]
async fn queued_start_runs_after_failure_too() {
    let mut ctx = setup();
    ctx.define(limited(SurpassBehaviour::Wait)).await;
    start_one(&mut ctx, "build").await;
    ctx.fire("push").await;

    let handle = ctx.actions.last_handle().unwrap();
    ctx.complete(&handle, false).await;

    assert_eq!(ctx.dispatched().len(), 2);
}

#[tokio::test]
async fn queued_start_of_deactivated_job_stays_queued() {
    let mut ctx = setup();
    ctx.define(limited(SurpassBehaviour::Wait)).await;
    start_one(&mut ctx, "build").await;
    ctx.fire("push").await;

    ctx.define(limited(SurpassBehaviour::Wait).with_active(false))
        .await;
    ctx.complete_last().await;

    let pending: Vec<_> = ctx
        .runtime
        .live_tasks()
        .filter(|t| t.status == TaskStatus::Pending)
        .collect();
    assert_eq!(pending.len(), 1);
    assert_eq!(ctx.dispatched().len(), 1);
}
