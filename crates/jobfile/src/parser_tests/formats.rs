// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use std::time::Duration;

const TOML: &str = r#"
[job.nightly]
schedule = "0 2 * * *"
concurrency = 2
on_surpass = "wait"
wait = { on = "ready", timeout = "30s" }

[[job.nightly.step]]
name = "collect"
collect = { cloud = "aws", region = "us-east-1" }
timeout = "10m"
wait = { on = "collect-done", timeout = "5m" }

[[job.nightly.step]]
run = "report.sh"
timeout = "30s"
"#;

fn expected_nightly() -> JobDescriptor {
    JobDescriptor::new(
        "nightly",
        TriggerSpec::time("0 2 * * *").unwrap(),
        vec![
            StepDef::new(
                StepAction::collect(json!({"cloud": "aws", "region": "us-east-1"})),
                Duration::from_secs(600),
            )
            .named("collect")
            .with_wait(WaitSpec::new(
                TriggerSpec::event("collect-done"),
                Duration::from_secs(300),
            )),
            StepDef::new(StepAction::command("report.sh"), Duration::from_secs(30)),
        ],
    )
    .with_wait(WaitSpec::new(
        TriggerSpec::event("ready"),
        Duration::from_secs(30),
    ))
    .with_concurrency(2, SurpassBehaviour::Wait)
}

#[test]
fn toml_full_job() {
    let jobs = parse_toml(TOML);
    assert_eq!(jobs, vec![expected_nightly()]);
    assert_eq!(jobs[0].steps[1].name, "step-2");
}

#[test]
fn hcl_full_job() {
    let hcl = r#"
job "nightly" {
  schedule    = "0 2 * * *"
  concurrency = 2
  on_surpass  = "wait"

  wait {
    on      = "ready"
    timeout = "30s"
  }

  step {
    name    = "collect"
    collect = { cloud = "aws", region = "us-east-1" }
    timeout = "10m"

    wait {
      on      = "collect-done"
      timeout = "5m"
    }
  }

  step {
    run     = "report.sh"
    timeout = "30s"
  }
}
"#;
    let jobs = parse_jobs(hcl, Format::Hcl).unwrap();
    assert_eq!(jobs, vec![expected_nightly()]);
}

#[test]
fn hcl_single_step_block() {
    let hcl = r#"
job "ping" {
  on = "tick"
  step {
    run     = "ping -c1 localhost"
    timeout = "5s"
  }
}
"#;
    let jobs = parse_jobs(hcl, Format::Hcl).unwrap();
    assert_eq!(jobs[0].steps.len(), 1);
    assert_eq!(jobs[0].trigger, TriggerSpec::event("tick"));
}

#[test]
fn json_full_job() {
    let json = json!({
        "job": {
            "nightly": {
                "schedule": "0 2 * * *",
                "concurrency": 2,
                "on_surpass": "wait",
                "wait": {"on": "ready", "timeout": "30s"},
                "steps": [
                    {
                        "name": "collect",
                        "collect": {"cloud": "aws", "region": "us-east-1"},
                        "timeout": "10m",
                        "wait": {"on": "collect-done", "timeout": "5m"}
                    },
                    {"run": "report.sh", "timeout": "30s"}
                ]
            }
        }
    });
    let jobs = parse_jobs(&json.to_string(), Format::Json).unwrap();
    assert_eq!(jobs, vec![expected_nightly()]);
}

#[test]
fn inactive_job_is_kept() {
    let jobs = parse_toml(
        r#"
        [job.paused]
        on = "go"
        active = false
        [[job.paused.step]]
        run = "true"
        timeout = "1s"
        "#,
    );
    assert!(!jobs[0].active);
}
