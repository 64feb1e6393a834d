//! `tallyd check` specs
//!
//! A job file is parsed and validated without starting the daemon.

use crate::prelude::*;

#[test]
fn valid_file_lists_jobs() {
    let project = Project::empty();
    project.file("jobs.toml", TOUCH_JOBS);
    let path = project.state_path().join("jobs.toml");

    project
        .tallyd()
        .args(&["check", path.to_str().unwrap()])
        .passes()
        .stdout_eq(&format!(
            "{}: 1 job(s) ok\n  touch (1 step(s))\n",
            path.display()
        ));
}

#[test]
fn hcl_file_is_accepted() {
    let project = Project::empty();
    project.file(
        "jobs.hcl",
        r#"
job "nightly" {
  schedule = "0 2 * * *"

  step {
    name    = "collect"
    collect = { cloud = "aws" }
    timeout = "10m"
  }
}
"#,
    );
    let path = project.state_path().join("jobs.hcl");

    project
        .tallyd()
        .args(&["check", path.to_str().unwrap()])
        .passes()
        .stdout_has("nightly (1 step(s))");
}

#[test]
fn empty_command_is_rejected() {
    let project = Project::empty();
    project.file(
        "jobs.toml",
        "[job.bad]\non = \"x\"\n\n[[job.bad.step]]\nrun = \"\"\ntimeout = \"1s\"\n",
    );
    let path = project.state_path().join("jobs.toml");

    project
        .tallyd()
        .args(&["check", path.to_str().unwrap()])
        .fails()
        .stderr_has("jobs.toml");
}

#[test]
fn malformed_schedule_is_rejected() {
    let project = Project::empty();
    project.file(
        "jobs.toml",
        "[job.cron]\nschedule = \"every tuesday\"\n\n[[job.cron.step]]\nrun = \"true\"\ntimeout = \"1s\"\n",
    );
    let path = project.state_path().join("jobs.toml");

    project
        .tallyd()
        .args(&["check", path.to_str().unwrap()])
        .fails()
        .stderr_has("job.cron");
}

#[test]
fn unknown_extension_is_rejected() {
    let project = Project::empty();
    project.file("jobs.yaml", "job: {}");
    let path = project.state_path().join("jobs.yaml");

    project
        .tallyd()
        .args(&["check", path.to_str().unwrap()])
        .fails()
        .stderr_has("unrecognized job file extension");
}

#[test]
fn missing_path_argument_fails() {
    tallyd()
        .args(&["check"])
        .fails()
        .stderr_has("check needs a job file");
}
