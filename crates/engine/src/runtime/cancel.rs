// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator cancellation

use super::{step_name, Runtime, Transition};
use crate::handle::CancelOutcome;
use crate::RuntimeError;
use tally_adapters::{ActionExecutor, NotifyAdapter};
use tally_core::{kinds, Clock, Effect, IdGen, TaskId, TimerId};

impl<X, N, C, G> Runtime<X, N, C, G>
where
    X: ActionExecutor,
    N: NotifyAdapter,
    C: Clock,
    G: IdGen,
{
    /// Cancel a task instance.
    ///
    /// Live instances end `Cancelled`; their timers are dropped and any
    /// in-flight action is asked to stop. Finished instances are left as is.
    /// A failed lookup of an untracked id is reported, not taken as absence.
    pub async fn cancel(&mut self, task_id: &TaskId) -> Result<CancelOutcome, RuntimeError> {
        if let Some(transition) = self.cancel_transition(task_id, "cancelled by operator") {
            self.apply(vec![transition]).await;
            return Ok(CancelOutcome::Accepted);
        }

        let stored = self.task_store.get(task_id.as_str()).await.map_err(|e| {
            tracing::error!(%task_id, error = %e, "cancel lookup failed");
            RuntimeError::Store(e)
        })?;
        Ok(match stored {
            Some(task) if task.is_terminal() => {
                tracing::info!(%task_id, status = %task.status, "cancel ignored, task already finished");
                CancelOutcome::AlreadyTerminal
            }
            Some(_) => {
                // Stored as live but not tracked; the store is ahead of us.
                tracing::warn!(%task_id, "cancel for untracked live task");
                CancelOutcome::NotFound
            }
            None => CancelOutcome::NotFound,
        })
    }

    /// Decide the cancellation of a live instance.
    pub(crate) fn cancel_transition(
        &mut self,
        task_id: &TaskId,
        reason: &str,
    ) -> Option<Transition> {
        let mut task = self.live.get(task_id)?.clone();
        let name = step_name(self.jobs.get(&task.job_id), task.step);
        let handle = match task.cancel(&name, self.now_ms()) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(error = %e, "cancel not applied");
                return None;
            }
        };
        tracing::info!(%task_id, job_id = %task.job_id, reason, "task cancelled");
        if let Some(queue) = self.queued.get_mut(&task.job_id) {
            queue.retain(|id| id != task_id);
        }

        let mut effects = vec![
            Effect::CancelTimer {
                id: TimerId::step_timeout(&task.id),
            },
            Effect::CancelTimer {
                id: TimerId::wait_deadline(&task.id),
            },
        ];
        if let Some(handle) = handle {
            self.handles.remove(&handle);
            effects.push(Effect::CancelWork {
                task_id: task.id.clone(),
                handle,
            });
        }
        effects.push(self.lifecycle(kinds::TASK_FINISHED, &task));
        Some(Transition { task, effects })
    }
}
