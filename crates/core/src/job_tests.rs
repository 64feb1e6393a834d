// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn wait_spec(secs: u64) -> WaitSpec {
    WaitSpec::new(TriggerSpec::event("wait"), Duration::from_secs(secs))
}

fn two_steps() -> JobDescriptor {
    JobDescriptor::new(
        "inventory",
        TriggerSpec::event("start"),
        vec![
            StepDef::new(StepAction::collect(json!({"cloud": "aws"})), Duration::from_secs(60))
                .named("collect"),
            StepDef::new(StepAction::command("echo done"), Duration::from_secs(5)),
        ],
    )
}

#[test]
fn single_step_shape() {
    let job = JobDescriptor::single(
        "id_a",
        "echo a",
        Duration::from_secs(10),
        TriggerSpec::event("a"),
        Some(wait_spec(30)),
    );
    assert_eq!(job.id, "id_a");
    assert_eq!(job.steps.len(), 1);
    assert_eq!(job.steps[0].name, "step-1");
    assert_eq!(job.steps[0].action, StepAction::command("echo a"));
    assert_eq!(job.concurrency, 1);
    assert!(job.active);
    assert!(job.validate().is_ok());
}

#[test]
fn default_names_are_one_based() {
    let job = two_steps();
    assert_eq!(job.steps[0].name, "collect");
    assert_eq!(job.steps[1].name, "step-2");
}

#[test]
fn step_wait_overrides_descriptor_default() {
    let mut job = two_steps().with_wait(wait_spec(30));
    job.steps[1].wait = Some(wait_spec(5));

    assert_eq!(job.wait_for(0), Some(&wait_spec(30)));
    assert_eq!(job.wait_for(1), Some(&wait_spec(5)));
    assert_eq!(job.wait_for(2), Some(&wait_spec(30)));
    assert_eq!(two_steps().wait_for(0), None);
}

#[test]
fn last_step_detection() {
    let job = two_steps();
    assert!(!job.is_last_step(0));
    assert!(job.is_last_step(1));
}

#[test]
fn validation_rejects_malformed_descriptors() {
    let no_steps = JobDescriptor::new("a", TriggerSpec::event("go"), vec![]);
    assert!(matches!(no_steps.validate(), Err(ValidationError::NoSteps { .. })));

    let mut zero_timeout = two_steps();
    zero_timeout.steps[0].timeout = Duration::ZERO;
    assert!(matches!(
        zero_timeout.validate(),
        Err(ValidationError::ZeroStepTimeout { step, .. }) if step == "collect"
    ));

    let zero_wait = two_steps().with_wait(wait_spec(0));
    assert!(matches!(
        zero_wait.validate(),
        Err(ValidationError::ZeroWaitTimeout { step: None, .. })
    ));

    let zero_runs = two_steps().with_concurrency(0, SurpassBehaviour::Skip);
    assert!(matches!(
        zero_runs.validate(),
        Err(ValidationError::ZeroConcurrency { .. })
    ));

    let mut dup = two_steps();
    dup.steps[1].name = "collect".to_string();
    assert!(matches!(
        dup.validate(),
        Err(ValidationError::DuplicateStep { .. })
    ));

    let empty_cmd = JobDescriptor::single(
        "a",
        " ",
        Duration::from_secs(1),
        TriggerSpec::event("go"),
        None,
    );
    assert!(matches!(
        empty_cmd.validate(),
        Err(ValidationError::EmptyCommand { .. })
    ));

    let empty_id = JobDescriptor::single("", "x", Duration::from_secs(1), TriggerSpec::event("go"), None);
    assert_eq!(empty_id.validate(), Err(ValidationError::EmptyId));

    let bad_trigger = JobDescriptor::single("a", "x", Duration::from_secs(1), TriggerSpec::event(""), None);
    assert!(matches!(
        bad_trigger.validate(),
        Err(ValidationError::Trigger { .. })
    ));
}

#[test]
fn zero_step_wait_names_the_step() {
    let mut job = two_steps();
    job.steps[1].wait = Some(wait_spec(0));
    let err = job.validate().unwrap_err();
    assert_eq!(
        err.to_string(),
        "job 'inventory' has a zero wait timeout on step 'step-2'"
    );
}

#[test]
fn descriptor_json_defaults() {
    let job: JobDescriptor = serde_json::from_value(json!({
        "id": "nightly",
        "trigger": {"type": "time", "schedule": "0 2 * * *"},
        "steps": [
            {"action": {"type": "execute_command", "command": "collect.sh"}, "timeout": "10m"}
        ]
    }))
    .unwrap();

    assert_eq!(job.concurrency, 1);
    assert_eq!(job.on_surpass, SurpassBehaviour::Skip);
    assert!(job.active);
    assert!(job.wait.is_none());
    assert_eq!(job.steps[0].timeout, Duration::from_secs(600));
    // Names are filled by normalization, not by serde
    assert!(job.steps[0].name.is_empty());
    assert_eq!(job.normalized().steps[0].name, "step-1");
}

#[test]
fn descriptor_round_trips_through_json() {
    let job = two_steps()
        .with_wait(wait_spec(30))
        .with_concurrency(2, SurpassBehaviour::Wait)
        .with_active(false);
    let json = serde_json::to_string(&job).unwrap();
    let back: JobDescriptor = serde_json::from_str(&json).unwrap();
    assert_eq!(back, job);
}

#[yare::parameterized(
    command = { StepAction::command("ls"), "execute_command" },
    collect = { StepAction::collect(json!(null)), "collect_work" },
)]
fn action_kind(action: StepAction, expected: &str) {
    assert_eq!(action.kind(), expected);
}
