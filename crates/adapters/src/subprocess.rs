// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Default timeout for command steps.
/// Set to 10 minutes as a safety net; the engine's step timeout normally fires first.
pub const SHELL_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

/// Longest stderr tail carried in a failure message.
const MAX_TAIL: usize = 512;

/// Run a subprocess command with a timeout.
///
/// Wraps `Command::output()` with `tokio::time::timeout`, converting
/// timeout expiration into a descriptive error message. The child process
/// is killed automatically if the timeout elapses (via the tokio `Child`
/// drop implementation).
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, String> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(io_err)) => Err(format!("{} failed: {}", description, io_err)),
        Err(_elapsed) => Err(format!(
            "{} timed out after {}s",
            description,
            timeout.as_secs()
        )),
    }
}

/// Describe a finished process for a completion message.
///
/// `None` on success; otherwise the exit status plus the tail of stderr.
pub fn failure_message(output: &Output) -> Option<String> {
    if output.status.success() {
        return None;
    }
    let status = match output.status.code() {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    };
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        return Some(status);
    }
    let start = stderr
        .char_indices()
        .rev()
        .nth(MAX_TAIL - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    Some(format!("{}: {}", status, &stderr[start..]))
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
