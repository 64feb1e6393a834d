//! Daemon help and version specs
//!
//! Verify tallyd --help, --version, and related flags work without
//! acquiring the daemon lock (no startup attempt).

use crate::prelude::*;

#[yare::parameterized(
    long    = { "--version" },
    short   = { "-v" },
    capital = { "-V" },
)]
fn version_flags_print_version(flag: &str) {
    tallyd()
        .args(&[flag])
        .passes()
        .stdout_eq(concat!("tallyd ", env!("CARGO_PKG_VERSION"), "\n"));
}

#[yare::parameterized(
    long  = { "--help" },
    short = { "-h" },
    word  = { "help" },
)]
fn help_flags_show_usage(flag: &str) {
    tallyd()
        .args(&[flag])
        .passes()
        .stdout_has("USAGE:")
        .stdout_has("tallyd check <jobfile>")
        .stdout_has("--version");
}

#[test]
fn help_does_not_take_the_lock() {
    let project = Project::empty();
    project.tallyd().args(&["--help"]).passes();
    assert!(!project.state_path().join("daemon.pid").exists());
}

#[test]
fn unknown_argument_fails_with_usage() {
    tallyd()
        .args(&["--frobnicate"])
        .fails()
        .stderr_has("unexpected argument '--frobnicate'")
        .stderr_has("Usage: tallyd");
}
