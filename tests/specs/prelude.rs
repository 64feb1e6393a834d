//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL for testing tallyd behavior.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};

// Spec polling timeouts
pub const SPEC_POLL_INTERVAL_MS: u64 = 10;
pub const SPEC_WAIT_MAX_MS: u64 = 5000;

/// Returns the path to a binary, checking llvm-cov target directory first.
/// Falls back to resolving relative to the test binary itself when
/// CARGO_MANIFEST_DIR is stale.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // The test binary lives at target/debug/deps/specs-<hash>, so its
    // grandparent is target/debug/ where tallyd is built.
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

/// Returns the path to the tallyd binary.
pub fn tallyd_binary() -> PathBuf {
    binary_path("tallyd")
}

/// Create a builder for tallyd invocations
pub fn tallyd() -> CliBuilder {
    CliBuilder::new()
}

/// High-level CLI builder for fluent test assertions
pub struct CliBuilder {
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// Add CLI arguments
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Set environment variable
    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((
            key.to_string(),
            value.as_ref().to_string_lossy().to_string(),
        ));
        self
    }

    /// Build the command without running it
    pub fn command(self) -> Command {
        let mut cmd = Command::new(tallyd_binary());
        cmd.args(&self.args);

        // Keep a developer's own state and log filter out of the test run
        cmd.env_remove("TALLY_STATE_DIR");
        cmd.env_remove("RUST_LOG");

        for (key, value) in self.envs {
            cmd.env(key, value);
        }

        cmd
    }

    /// Run and expect success (exit code 0)
    pub fn passes(self) -> RunAssert {
        let assert = assert_cmd::Command::from_std(self.command())
            .assert()
            .success();
        RunAssert {
            output: assert.get_output().clone(),
        }
    }

    /// Run and expect failure (non-zero exit code)
    pub fn fails(self) -> RunAssert {
        let assert = assert_cmd::Command::from_std(self.command())
            .assert()
            .failure();
        RunAssert {
            output: assert.get_output().clone(),
        }
    }
}

/// Result of a CLI run for chaining assertions
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    /// Get stdout as string
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    /// Get stderr as string
    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    /// Assert stdout equals expected exactly (with diff on failure).
    /// **Prefer this for format specs** - catches format regressions.
    pub fn stdout_eq(self, expected: &str) -> Self {
        let stdout = self.stdout();
        similar_asserts::assert_eq!(stdout, expected);
        self
    }

    /// Assert stdout contains substring.
    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{}'\nstdout: {}",
            expected,
            stdout
        );
        self
    }

    /// Assert stderr contains substring.
    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain '{}'\nstderr: {}",
            expected,
            stderr
        );
        self
    }
}

// =============================================================================
// Polling
// =============================================================================

/// Poll a condition until it returns true or timeout is reached.
pub fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);
    let poll_interval = std::time::Duration::from_millis(SPEC_POLL_INTERVAL_MS);

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(poll_interval);
    }
    false
}

// =============================================================================
// Project
// =============================================================================

/// Isolated state directory with a daemon that is stopped on drop.
pub struct Project {
    state_dir: tempfile::TempDir,
    daemon: Option<Child>,
}

impl Project {
    pub fn empty() -> Self {
        Self {
            state_dir: tempfile::tempdir().unwrap(),
            daemon: None,
        }
    }

    /// Write a file under the state directory
    pub fn file(&self, path: impl AsRef<Path>, content: &str) {
        let full_path = self.state_dir.path().join(path.as_ref());
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full_path, content).unwrap();
    }

    pub fn state_path(&self) -> &Path {
        self.state_dir.path()
    }

    /// Run tallyd against this project's state directory
    pub fn tallyd(&self) -> CliBuilder {
        tallyd().env("TALLY_STATE_DIR", self.state_path())
    }

    /// Start the daemon in the background and wait for its PID file.
    pub fn daemon_start(&mut self) {
        let mut cmd = self.tallyd().command();
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
        self.daemon = Some(cmd.spawn().unwrap());

        let pid_file = self.state_path().join("daemon.pid");
        let started = wait_for(SPEC_WAIT_MAX_MS, || {
            std::fs::read_to_string(&pid_file)
                .map(|s| !s.trim().is_empty())
                .unwrap_or(false)
        });
        assert!(started, "daemon never wrote its PID\n{}", self.daemon_log());
    }

    /// Send SIGTERM and wait for the daemon to exit.
    pub fn daemon_stop(&mut self) -> std::process::ExitStatus {
        let mut child = self.daemon.take().expect("daemon not started");
        Command::new("kill")
            .args(["-TERM", &child.id().to_string()])
            .status()
            .unwrap();
        child.wait().unwrap()
    }

    /// Read the daemon log file contents (for debugging test failures)
    pub fn daemon_log(&self) -> String {
        let log_path = self.state_path().join("daemon.log");
        std::fs::read_to_string(&log_path).unwrap_or_else(|_| "(no daemon log)".to_string())
    }

    /// Read a persisted collection as JSON
    pub fn collection(&self, name: &str) -> serde_json::Value {
        let path = self.state_path().join(name);
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or(serde_json::Value::Null)
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        if let Some(mut child) = self.daemon.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Single-step job that touches a marker file in the state directory
pub const TOUCH_JOBS: &str = r#"
[job.touch]
on = "touch-requested"

[[job.touch.step]]
name = "touch"
run = "touch marker"
timeout = "10s"
"#;
