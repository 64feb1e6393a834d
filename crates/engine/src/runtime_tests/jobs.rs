// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Defining and removing jobs

use super::*;
use serde_json::json;
use tally_core::ValidationError;

#[tokio::test]
async fn define_stores_and_installs() {
    let mut ctx = setup();

    let ids = ctx
        .runtime
        .define_jobs(vec![command_job("a", "push"), command_job("b", "push")])
        .await
        .unwrap();

    assert_eq!(ids, vec![JobId::new("a"), JobId::new("b")]);
    assert_eq!(ctx.runtime.jobs().count(), 2);
    assert!(ctx.jobs.get("a").await.unwrap().is_some());
    assert_eq!(ctx.event_kinds(), vec![kinds::JOB_UPDATED_MANY]);
}

#[tokio::test]
async fn invalid_batch_writes_nothing() {
    let mut ctx = setup();
    let mut broken = command_job("broken", "push");
    broken.steps.clear();

    let err = ctx
        .runtime
        .define_jobs(vec![command_job("good", "push"), broken])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RuntimeError::Validation(ValidationError::NoSteps { .. })
    ));
    assert!(ctx.jobs.all().await.unwrap().is_empty());
    assert_eq!(ctx.runtime.jobs().count(), 0);
}

#[tokio::test]
async fn redefining_replaces_the_descriptor() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;
    ctx.define(command_job("build", "tag")).await;

    ctx.fire("push").await;
    assert!(ctx.live_for("build").is_empty());
    ctx.fire("tag").await;
    assert_eq!(ctx.live_for("build").len(), 1);
}

#[tokio::test]
async fn remove_cancels_live_tasks() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;
    let id = start_one(&mut ctx, "build").await;
    let job = JobId::new("build");

    ctx.runtime.remove_job(&job).await.unwrap();

    assert_eq!(ctx.stored(&id).await.status, TaskStatus::Cancelled);
    assert_eq!(ctx.actions.cancelled().len(), 1);
    assert!(ctx.jobs.get("build").await.unwrap().is_none());
    ctx.fire("push").await;
    assert!(ctx.live_for("build").is_empty());

    let err = ctx.runtime.remove_job(&job).await.unwrap_err();
    assert!(matches!(err, RuntimeError::JobNotFound(_)));
}

#[tokio::test]
async fn store_update_event_installs_job() {
    let mut ctx = setup();
    ctx.jobs
        .update_many(vec![command_job("build", "push")])
        .await
        .unwrap();

    ctx.deliver(Event::new(
        kinds::JOB_UPDATED_MANY,
        json!({ "ids": ["build"] }),
    ))
    .await;

    assert_eq!(ctx.runtime.jobs().count(), 1);
    ctx.fire("push").await;
    assert_eq!(ctx.live_for("build").len(), 1);
}

#[tokio::test]
async fn invalid_stored_job_is_ignored() {
    let mut ctx = setup();
    let mut broken = command_job("build", "push");
    broken.concurrency = 0;
    ctx.jobs.update_many(vec![broken]).await.unwrap();

    ctx.deliver(Event::new(
        kinds::JOB_UPDATED_MANY,
        json!({ "ids": ["build"] }),
    ))
    .await;

    assert_eq!(ctx.runtime.jobs().count(), 0);
}

#[tokio::test]
async fn store_delete_event_forgets_job() {
    let mut ctx = setup();
    ctx.define(command_job("build", "push")).await;
    let id = start_one(&mut ctx, "build").await;

    ctx.deliver(Event::new(kinds::JOB_DELETED, json!({ "id": "build" })))
        .await;

    assert_eq!(ctx.runtime.jobs().count(), 0);
    assert_eq!(ctx.stored(&id).await.status, TaskStatus::Cancelled);
}
