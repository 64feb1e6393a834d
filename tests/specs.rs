//! Behavioral specifications for tallyd.
//!
//! These tests are black-box: they invoke the daemon binary and verify
//! stdout, stderr, exit codes, and the files it leaves in its state dir.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// daemon/
#[path = "specs/daemon/check.rs"]
mod daemon_check;
#[path = "specs/daemon/help.rs"]
mod daemon_help;
#[path = "specs/daemon/lifecycle.rs"]
mod daemon_lifecycle;
