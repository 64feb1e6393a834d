//! Daemon lifecycle specs
//!
//! Start, lock, run a job, and stop on SIGTERM.

use crate::prelude::*;

#[test]
fn start_writes_pid_and_version() {
    let mut project = Project::empty();
    project.daemon_start();

    let version = std::fs::read_to_string(project.state_path().join("daemon.version")).unwrap();
    assert_eq!(version, env!("CARGO_PKG_VERSION"));
    assert!(project.daemon_log().contains("--- tallyd: starting (pid: "));

    let status = project.daemon_stop();
    assert!(status.success(), "{}", project.daemon_log());
    assert!(!project.state_path().join("daemon.pid").exists());
    assert!(!project.state_path().join("daemon.version").exists());
}

#[test]
fn second_daemon_reports_running_one() {
    let mut project = Project::empty();
    project.daemon_start();

    project
        .tallyd()
        .fails()
        .stderr_has("tallyd is already running")
        .stderr_has("pid: ");

    project.daemon_stop();
}

#[test]
fn bad_settings_fail_startup() {
    let project = Project::empty();
    project.file("config.toml", "tick_interval = \"whenever\"\n");

    project
        .tallyd()
        .fails()
        .stderr_has("config.toml");
}

#[test]
fn subscriber_timeout_starts_configured_job() {
    let mut project = Project::empty();
    project.file("jobs.toml", TOUCH_JOBS);
    project.file(
        "config.toml",
        &format!(
            r#"
jobs_file = "jobs.toml"
work_dir = "{}"

[start_on_subscriber]
channel = "collectors"
timeout = "1s"
jobs = ["touch"]
"#,
            project.state_path().display()
        ),
    );
    project.daemon_start();

    let marker = project.state_path().join("marker");
    let ran = wait_for(SPEC_WAIT_MAX_MS, || marker.exists());
    assert!(ran, "job never ran\n{}", project.daemon_log());

    let done = wait_for(SPEC_WAIT_MAX_MS, || {
        project.collection("tasks.json")["entities"]
            .as_array()
            .is_some_and(|tasks| tasks.iter().any(|t| t["status"] == "done"))
    });
    assert!(done, "task never finished\n{}", project.daemon_log());

    project.daemon_stop();

    let jobs = project.collection("jobs.json");
    assert_eq!(jobs["entities"][0]["id"], "touch");
}
