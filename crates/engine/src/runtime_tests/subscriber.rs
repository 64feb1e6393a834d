// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Starting jobs once a subscriber connects

use super::*;
use serde_json::json;

fn config() -> RuntimeConfig {
    RuntimeConfig {
        start_on_subscriber: Some(StartOnSubscriber {
            channel: "updates".to_string(),
            timeout: Duration::from_secs(30),
            jobs: vec![JobId::new("warmup")],
        }),
        ..test_config()
    }
}

fn connected(channels: &[&str]) -> Event {
    Event::new(
        kinds::SUBSCRIBER_CONNECTED,
        json!({ "channels": channels }),
    )
}

#[tokio::test]
async fn starts_when_channel_subscriber_connects() {
    let mut ctx = setup_with(config());
    ctx.define(command_job("warmup", "never")).await;

    ctx.deliver(connected(&["other"])).await;
    assert!(ctx.live_for("warmup").is_empty());

    ctx.deliver(connected(&["other", "updates"])).await;
    assert_eq!(ctx.live_for("warmup").len(), 1);
}

#[tokio::test]
async fn starts_only_once() {
    let mut ctx = setup_with(config());
    ctx.define(command_job("warmup", "never")).await;

    ctx.deliver(connected(&["updates"])).await;
    ctx.complete_last().await;
    ctx.deliver(connected(&["updates"])).await;
    ctx.advance(Duration::from_secs(60)).await;

    assert_eq!(ctx.dispatched().len(), 1);
}

#[tokio::test]
async fn starts_after_timeout_without_subscriber() {
    let mut ctx = setup_with(config());
    ctx.define(command_job("warmup", "never")).await;

    ctx.advance(Duration::from_secs(29)).await;
    assert!(ctx.live_for("warmup").is_empty());

    ctx.advance(Duration::from_secs(2)).await;
    assert_eq!(ctx.live_for("warmup").len(), 1);
}

#[tokio::test]
async fn without_config_nothing_starts() {
    let mut ctx = setup();
    ctx.define(command_job("warmup", "never")).await;

    ctx.deliver(connected(&["updates"])).await;
    ctx.advance(Duration::from_secs(60)).await;

    assert!(ctx.dispatched().is_empty());
}
