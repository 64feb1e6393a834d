// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use tally_core::{KindFilter, SequentialIdGen, Subscription, TaskId};

fn setup() -> (ShellExecutor<SequentialIdGen>, Subscription) {
    let bus = EventBus::default();
    let sub = bus.subscribe(KindFilter::only([kinds::TASK_ACTION_COMPLETED]));
    let exec = ShellExecutor::new(bus, ShellConfig::default(), SequentialIdGen::new("h"));
    (exec, sub)
}

fn request(command: &str) -> DispatchRequest {
    DispatchRequest {
        task_id: TaskId::new("t1"),
        job_id: "job".into(),
        step: 0,
        action: StepAction::command(command),
    }
}

async fn next_completion(sub: &mut Subscription) -> ActionCompleted {
    let event = tokio::time::timeout(Duration::from_secs(5), sub.recv())
        .await
        .expect("completion within 5s")
        .expect("bus open");
    event.decode().unwrap()
}

#[yare::parameterized(
    success      = { "true",                       true,  None },
    exit_code    = { "exit 4",                     false, Some("exit status 4") },
    task_env     = { "test \"$TALLY_TASK_ID\" = t1", true,  None },
    step_env     = { "test \"$TALLY_STEP\" = 0",     true,  None },
)]
#[test_macro(tokio::test)]
async fn reports_outcome_on_bus(command: &str, success: bool, message: Option<&str>) {
    let (exec, mut sub) = setup();
    let handle = exec.dispatch(request(command)).await.unwrap();
    assert_eq!(handle, "h-1");

    let done = next_completion(&mut sub).await;
    assert_eq!(done.handle, "h-1");
    assert_eq!(done.success, success);
    assert_eq!(done.message.as_deref(), message);
}

#[tokio::test]
async fn rejects_collect_actions() {
    let (exec, _sub) = setup();
    let mut req = request("unused");
    req.action = StepAction::collect(json!({"queue": "q"}));
    assert_eq!(
        exec.dispatch(req).await,
        Err(DispatchError::Unsupported("collect_work"))
    );
}

#[tokio::test]
async fn rejects_blank_command() {
    let (exec, _sub) = setup();
    assert!(matches!(
        exec.dispatch(request("   ")).await,
        Err(DispatchError::Rejected(_))
    ));
}

#[tokio::test]
async fn timeout_reports_failure() {
    let bus = EventBus::default();
    let mut sub = bus.subscribe(KindFilter::All);
    let config = ShellConfig {
        timeout: Duration::from_millis(100),
        ..ShellConfig::default()
    };
    let exec = ShellExecutor::new(bus, config, SequentialIdGen::new("h"));
    exec.dispatch(request("sleep 10")).await.unwrap();

    let done = next_completion(&mut sub).await;
    assert!(!done.success);
    assert!(done.message.unwrap().contains("timed out"));
}

#[tokio::test]
async fn cancel_stops_work_without_completion() {
    let (exec, mut sub) = setup();
    let handle = exec.dispatch(request("sleep 10")).await.unwrap();
    assert_eq!(exec.in_flight(), 1);

    exec.cancel(&handle).await;
    assert_eq!(exec.in_flight(), 0);

    let waited = tokio::time::timeout(Duration::from_millis(200), sub.recv()).await;
    assert!(waited.is_err(), "cancelled work must not complete");
}

#[tokio::test]
async fn cancel_unknown_handle_is_ignored() {
    let (exec, _sub) = setup();
    exec.cancel(&ActionHandle::new("nope")).await;
    assert_eq!(exec.in_flight(), 0);
}

#[tokio::test]
async fn work_dir_is_applied() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("marker"), "x").unwrap();
    let bus = EventBus::default();
    let mut sub = bus.subscribe(KindFilter::All);
    let config = ShellConfig {
        work_dir: Some(dir.path().to_path_buf()),
        ..ShellConfig::default()
    };
    let exec = ShellExecutor::new(bus, config, SequentialIdGen::new("h"));
    exec.dispatch(request("test -f marker")).await.unwrap();
    assert!(next_completion(&mut sub).await.success);
}
