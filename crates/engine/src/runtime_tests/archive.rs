// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retention of finished instances

use super::*;

#[tokio::test]
async fn keeps_newest_finished_per_job() {
    let mut ctx = setup_with(RuntimeConfig {
        retain_finished: 2,
        ..test_config()
    });
    ctx.define(command_job("build", "push")).await;
    ctx.define(command_job("lint", "lint")).await;
    ctx.fire("lint").await;
    ctx.complete_last().await;

    let mut ids = Vec::new();
    for _ in 0..4 {
        ids.push(start_one(&mut ctx, "build").await);
        ctx.complete_last().await;
        ctx.clock.advance(Duration::from_secs(1));
    }

    let kept: Vec<TaskId> = ctx
        .stored_for("build")
        .await
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(kept, ids[2..].to_vec());
    assert_eq!(ctx.stored_for("lint").await.len(), 1);
}

#[tokio::test]
async fn live_tasks_are_never_archived() {
    let mut ctx = setup_with(RuntimeConfig {
        retain_finished: 0,
        ..test_config()
    });
    ctx.define(command_job("build", "push").with_concurrency(2, tally_core::SurpassBehaviour::Skip))
        .await;
    ctx.fire("push").await;
    ctx.fire("push").await;

    let first = ctx.actions.dispatched()[0].0.clone();
    ctx.complete(&first, true).await;

    let stored = ctx.stored_for("build").await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, TaskStatus::Running);
}
