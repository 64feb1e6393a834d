// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tally_core::KindFilter;

fn alert() -> OperatorAlert {
    OperatorAlert {
        title: "persistence exhausted".into(),
        message: "task t1 forced to failed".into(),
        task_id: Some("t1".into()),
    }
}

fn assert_clone<T: Clone>() {}
fn assert_send<T: Send>() {}
fn assert_sync<T: Sync>() {}

#[test]
fn bus_notify_adapter_is_clone_send_sync() {
    assert_clone::<BusNotifyAdapter>();
    assert_send::<BusNotifyAdapter>();
    assert_sync::<BusNotifyAdapter>();
}

#[tokio::test]
async fn bus_notify_publishes_operator_alert() {
    let bus = EventBus::default();
    let mut sub = bus.subscribe(KindFilter::only([kinds::OPERATOR_ALERT]));
    let adapter = BusNotifyAdapter::new(bus);

    adapter.notify(&alert()).await.unwrap();

    let received: OperatorAlert = sub.try_recv().unwrap().decode().unwrap();
    assert_eq!(received, alert());
}

#[tokio::test]
async fn bus_notify_without_listeners_reports_failure() {
    let adapter = BusNotifyAdapter::new(EventBus::default());
    let result = adapter.notify(&alert()).await;
    assert!(matches!(result, Err(NotifyError::SendFailed(_))));
}
