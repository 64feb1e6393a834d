// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resuming persisted state after a restart

use super::{Runtime, Transition};
use crate::error::RuntimeError;
use tally_adapters::{ActionExecutor, NotifyAdapter};
use tally_core::{Clock, Effect, IdGen, JobId, TaskInstance, TaskStatus, TimerId};
use tally_storage::StoreError;

impl<X, N, C, G> Runtime<X, N, C, G>
where
    X: ActionExecutor,
    N: NotifyAdapter,
    C: Clock,
    G: IdGen,
{
    /// Load descriptors and resume every non-terminal instance.
    ///
    /// `Running` instances re-dispatch their current step, so an action
    /// interrupted by the restart may run twice. `Waiting` instances keep
    /// the time left on their deadline. `Pending` ones are queued again.
    /// Returns how many instances were resumed.
    pub async fn recover(&mut self) -> Result<usize, RuntimeError> {
        let timeout = self.config.store_timeout;
        let jobs = tokio::time::timeout(timeout, self.job_store.all())
            .await
            .map_err(|_| StoreError::Timeout { op: "all", after: timeout })??;
        for job in jobs.iter() {
            let job = job.clone().normalized();
            match job.validate() {
                Ok(()) => self.install(job),
                Err(e) => tracing::warn!(job_id = %job.id, error = %e, "stored job is invalid, skipped"),
            }
        }

        let tasks = tokio::time::timeout(timeout, self.task_store.all())
            .await
            .map_err(|_| StoreError::Timeout { op: "all", after: timeout })??;
        let mut unfinished: Vec<TaskInstance> =
            tasks.iter().filter(|t| !t.is_terminal()).cloned().collect();
        unfinished.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        });

        let resumed = unfinished.len();
        let mut transitions = Vec::new();
        for task in unfinished {
            if let Some(t) = self.resume(task) {
                transitions.push(t);
            }
        }
        self.apply(transitions).await;

        let queued: Vec<JobId> = self.queued.keys().cloned().collect();
        for job_id in queued {
            let released = self.release_queued(&job_id);
            self.apply(released).await;
        }

        self.last_tick = self.clock().utc_now();
        tracing::info!(
            jobs = self.jobs.len(),
            resumed,
            live = self.live.len(),
            "recovered state"
        );
        Ok(resumed)
    }

    fn resume(&mut self, mut task: TaskInstance) -> Option<Transition> {
        let now = self.now_ms();
        let Some(job) = self.jobs.get(&task.job_id).cloned() else {
            return Some(self.orphaned(task));
        };

        match task.status {
            TaskStatus::Pending => {
                tracing::info!(task_id = %task.id, job_id = %task.job_id, "requeued pending task");
                self.queued
                    .entry(task.job_id.clone())
                    .or_default()
                    .push_back(task.id.clone());
                self.live.insert(task.id.clone(), task);
                None
            }
            TaskStatus::Running => {
                let Some(step) = job.step(task.step) else {
                    return Some(self.orphaned(task));
                };
                tracing::info!(task_id = %task.id, step = %step.name, "re-dispatching interrupted step");
                task.restart_step(step.timeout, now);
                let effects = vec![
                    Effect::SetTimer {
                        id: TimerId::step_timeout(&task.id),
                        duration: step.timeout,
                    },
                    Effect::Dispatch {
                        task_id: task.id.clone(),
                        job_id: job.id.clone(),
                        step: task.step,
                        action: step.action.clone(),
                    },
                ];
                Some(Transition { task, effects })
            }
            TaskStatus::Waiting => {
                let remaining = TaskInstance::remaining(task.wait_deadline_ms, now)
                    .or_else(|| job.wait_for(task.step).map(|w| w.timeout))
                    .unwrap_or_default();
                tracing::info!(task_id = %task.id, remaining_ms = remaining.as_millis() as u64, "re-armed wait");
                let instant = self.clock().now();
                self.executor.scheduler_mut().set_timer(
                    TimerId::wait_deadline(&task.id),
                    remaining,
                    instant,
                );
                self.live.insert(task.id.clone(), task);
                None
            }
            _ => None,
        }
    }
}
