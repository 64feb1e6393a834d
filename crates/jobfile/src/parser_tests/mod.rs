// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

mod errors;
mod formats;

// ---------------------------------------------------------------------------
// Shared test helpers
// ---------------------------------------------------------------------------

fn parse_toml(input: &str) -> Vec<JobDescriptor> {
    parse_jobs(input, Format::Toml).unwrap()
}

/// Assert that an error's display message contains all given fragments.
fn assert_err_contains(err: &JobFileError, fragments: &[&str]) {
    let msg = err.to_string();
    for frag in fragments {
        assert!(msg.contains(frag), "error should contain '{frag}': {msg}");
    }
}

fn assert_toml_err(input: &str, fragments: &[&str]) {
    assert_err_contains(&parse_jobs(input, Format::Toml).unwrap_err(), fragments);
}

#[test]
fn empty_file_has_no_jobs() {
    assert!(parse_toml("").is_empty());
}

#[test]
fn jobs_are_ordered_by_id() {
    let jobs = parse_toml(
        r#"
        [job.zeta]
        on = "go"
        [[job.zeta.step]]
        run = "true"
        timeout = "1s"

        [job.alpha]
        on = "go"
        [[job.alpha.step]]
        run = "true"
        timeout = "1s"
        "#,
    );
    let ids: Vec<_> = jobs.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, vec!["alpha", "zeta"]);
}

#[test]
fn load_jobs_picks_format_from_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.json");
    std::fs::write(
        &path,
        r#"{"job": {"a": {"on": "go", "step": [{"run": "true", "timeout": "5s"}]}}}"#,
    )
    .unwrap();

    let jobs = load_jobs(&path).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].trigger, TriggerSpec::event("go"));
}

#[test]
fn load_jobs_rejects_unknown_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.yaml");
    std::fs::write(&path, "").unwrap();
    assert!(matches!(
        load_jobs(&path),
        Err(JobFileError::UnknownFormat(_))
    ));
}

#[test]
fn load_jobs_reports_missing_file() {
    let err = load_jobs(Path::new("/nonexistent/jobs.toml")).unwrap_err();
    assert!(matches!(err, JobFileError::Io { .. }));
    assert_err_contains(&err, &["/nonexistent/jobs.toml"]);
}

#[yare::parameterized(
    toml = { "a.toml", Some(Format::Toml) },
    hcl  = { "a.hcl",  Some(Format::Hcl) },
    json = { "a.json", Some(Format::Json) },
    yaml = { "a.yaml", None },
    bare = { "jobs",   None },
)]
fn format_from_path(name: &str, expected: Option<Format>) {
    assert_eq!(Format::from_path(Path::new(name)), expected);
}
