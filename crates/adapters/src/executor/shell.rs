// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor for `execute_command` steps.

use super::{ActionExecutor, ActionHandle, DispatchError, DispatchRequest};
use crate::subprocess::{failure_message, run_with_timeout, SHELL_COMMAND_TIMEOUT};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tally_core::{kinds, ActionCompleted, Event, EventBus, IdGen, StepAction};
use tokio::process::Command;
use tokio::task::AbortHandle;

/// How commands are spawned.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Interpreter invoked as `<shell> -c <command>`.
    pub shell: String,
    /// Working directory for every command; inherits the daemon's when unset.
    pub work_dir: Option<PathBuf>,
    /// Hard ceiling on a single command's runtime.
    pub timeout: Duration,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            work_dir: None,
            timeout: SHELL_COMMAND_TIMEOUT,
        }
    }
}

/// Runs commands through a shell and reports completion on the bus.
#[derive(Clone)]
pub struct ShellExecutor<G> {
    bus: EventBus,
    config: Arc<ShellConfig>,
    ids: G,
    running: Arc<Mutex<HashMap<ActionHandle, AbortHandle>>>,
}

impl<G: IdGen> ShellExecutor<G> {
    pub fn new(bus: EventBus, config: ShellConfig, ids: G) -> Self {
        Self {
            bus,
            config: Arc::new(config),
            ids,
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of commands still running.
    pub fn in_flight(&self) -> usize {
        self.running.lock().len()
    }

    fn command(&self, request: &DispatchRequest, script: &str) -> Command {
        let mut cmd = Command::new(&self.config.shell);
        cmd.arg("-c").arg(script);
        if let Some(dir) = &self.config.work_dir {
            cmd.current_dir(dir);
        }
        cmd.env("TALLY_TASK_ID", request.task_id.as_str())
            .env("TALLY_JOB_ID", request.job_id.as_str())
            .env("TALLY_STEP", request.step.to_string());
        cmd
    }
}

#[async_trait]
impl<G: IdGen> ActionExecutor for ShellExecutor<G> {
    async fn dispatch(&self, request: DispatchRequest) -> Result<ActionHandle, DispatchError> {
        let script = match &request.action {
            StepAction::ExecuteCommand { command } => command.clone(),
            other => return Err(DispatchError::Unsupported(other.kind())),
        };
        if script.trim().is_empty() {
            return Err(DispatchError::Rejected("empty command".to_string()));
        }

        let handle = ActionHandle::new(self.ids.next());
        let cmd = self.command(&request, &script);
        let timeout = self.config.timeout;
        let description = format!("step {} of {}", request.step, request.task_id);
        let bus = self.bus.clone();
        let running = Arc::clone(&self.running);
        let task_handle = handle.clone();

        // Hold the lock across spawn so a fast command cannot finish and
        // deregister before it is registered.
        let mut guard = self.running.lock();
        let join = tokio::spawn(async move {
            let (success, message) = match run_with_timeout(cmd, timeout, &description).await {
                Ok(output) => match failure_message(&output) {
                    None => (true, None),
                    Some(msg) => (false, Some(msg)),
                },
                Err(msg) => (false, Some(msg)),
            };
            running.lock().remove(&task_handle);

            let payload = ActionCompleted {
                handle: task_handle.to_string(),
                success,
                message,
            };
            let event = Event::new(
                kinds::TASK_ACTION_COMPLETED,
                serde_json::to_value(&payload).unwrap_or_default(),
            );
            if let Err(e) = bus.publish(event) {
                tracing::warn!(handle = %task_handle, error = %e, "completion not delivered");
            }
        });
        guard.insert(handle.clone(), join.abort_handle());
        drop(guard);

        Ok(handle)
    }

    async fn cancel(&self, handle: &ActionHandle) {
        // Aborting drops the child future; kill_on_drop terminates the process.
        if let Some(abort) = self.running.lock().remove(handle) {
            abort.abort();
            tracing::info!(%handle, "command aborted");
        }
    }
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
