// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn event(kind: &str) -> Event {
    Event::new(kind, json!(null))
}

#[test]
fn publish_without_subscribers_errors() {
    let bus = EventBus::default();
    assert_eq!(
        bus.publish(event("x")),
        Err(PublishError::NoSubscribers {
            kind: "x".to_string()
        })
    );
}

#[test]
fn subscribers_receive_in_order() {
    let bus = EventBus::new();
    let mut sub = bus.subscribe(KindFilter::All);
    bus.publish(event("a")).unwrap();
    bus.publish(event("b")).unwrap();

    let kinds: Vec<_> = sub.drain().into_iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec!["a", "b"]);
}

#[test]
fn filter_skips_other_kinds() {
    let bus = EventBus::new();
    let mut sub = bus.subscribe(KindFilter::only(["job-deleted"]));
    bus.publish(event("job-updated-many")).unwrap();
    bus.publish(event("job-deleted")).unwrap();

    assert_eq!(sub.try_recv().map(|e| e.kind), Some("job-deleted".to_string()));
    assert!(sub.try_recv().is_none());
}

#[test]
fn fresh_subscription_does_not_replay() {
    let bus = EventBus::new();
    let _keep = bus.subscribe(KindFilter::All);
    bus.publish(event("old")).unwrap();

    let mut late = bus.subscribe(KindFilter::All);
    assert!(late.try_recv().is_none());
    bus.publish(event("new")).unwrap();
    assert_eq!(late.try_recv().map(|e| e.kind), Some("new".to_string()));
}

#[test]
fn slow_subscriber_loses_nothing() {
    let bus = EventBus::new();
    let mut sub = bus.subscribe(KindFilter::All);
    for n in 0..5_000 {
        bus.publish(event(&n.to_string())).unwrap();
    }
    bus.publish(event("last")).unwrap();

    let kinds: Vec<_> = sub.drain().into_iter().map(|e| e.kind).collect();
    assert_eq!(kinds.len(), 5_001);
    assert_eq!(kinds.first().map(String::as_str), Some("0"));
    assert_eq!(kinds.last().map(String::as_str), Some("last"));
}

#[test]
fn publish_counts_only_accepting_subscribers() {
    let bus = EventBus::new();
    let _all = bus.subscribe(KindFilter::All);
    let _other = bus.subscribe(KindFilter::only(["job-deleted"]));
    assert_eq!(bus.publish(event("task-started")), Ok(1));
    assert_eq!(bus.publish(event("job-deleted")), Ok(2));
}

#[test]
fn dropped_subscriptions_stop_counting_for_publish() {
    let bus = EventBus::new();
    let sub = bus.subscribe(KindFilter::All);
    drop(sub);
    assert!(bus.publish(event("x")).is_err());
}

#[test]
fn subscriber_count_tracks_drops() {
    let bus = EventBus::new();
    let a = bus.subscribe(KindFilter::All);
    let _b = bus.subscribe(KindFilter::All);
    assert_eq!(bus.subscriber_count(), 2);
    drop(a);
    assert_eq!(bus.subscriber_count(), 1);
}

#[tokio::test]
async fn recv_waits_for_publish() {
    let bus = EventBus::new();
    let mut sub = bus.subscribe(KindFilter::All);
    let publisher = bus.clone();
    tokio::spawn(async move {
        tokio::task::yield_now().await;
        publisher.publish(event("late")).unwrap();
    });
    assert_eq!(sub.recv().await.map(|e| e.kind), Some("late".to_string()));
}

#[tokio::test]
async fn recv_ends_when_bus_dropped() {
    let bus = EventBus::new();
    let mut sub = bus.subscribe(KindFilter::All);
    drop(bus);
    assert!(sub.recv().await.is_none());
}
