// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step progression: action completions, waits, and deadlines

use super::{step_name, Runtime, Transition};
use std::collections::HashSet;
use tally_adapters::{ActionExecutor, NotifyAdapter};
use tally_core::{
    format_elapsed_ms, kinds, ActionCompleted, Clock, Effect, Event, IdGen, JobDescriptor,
    Progress, Stimulus, TaskId, TaskInstance, TaskStatus, TimerId, TimerKind, WaitOutcome,
};

impl<X, N, C, G> Runtime<X, N, C, G>
where
    X: ActionExecutor,
    N: NotifyAdapter,
    C: Clock,
    G: IdGen,
{
    /// An executor reported the outcome of a dispatched action.
    pub(crate) fn on_action_completed(&mut self, event: &Event) -> Option<Transition> {
        let done: ActionCompleted = match event.decode() {
            Ok(done) => done,
            Err(e) => {
                tracing::warn!(error = %e, "malformed action completion ignored");
                return None;
            }
        };
        let Some(task_id) = self.handles.remove(&done.handle) else {
            tracing::debug!(handle = %done.handle, "completion for unknown handle ignored");
            return None;
        };
        let mut task = self.live.get(&task_id)?.clone();
        if task.status != TaskStatus::Running || task.handle.as_deref() != Some(done.handle.as_str()) {
            tracing::debug!(%task_id, handle = %done.handle, "stale completion ignored");
            return None;
        }
        let Some(job) = self.jobs.get(&task.job_id).cloned() else {
            return Some(self.orphaned(task));
        };

        let now = self.now_ms();
        let name = step_name(Some(&job), task.step);
        let mut effects = vec![Effect::CancelTimer {
            id: TimerId::step_timeout(&task.id),
        }];

        if !done.success {
            let reason = done.message.unwrap_or_else(|| "action failed".to_string());
            tracing::info!(%task_id, step = %name, %reason, "step failed");
            if let Err(e) = task.fail(&name, reason, now) {
                tracing::warn!(error = %e, "failure not applied");
                return None;
            }
            effects.push(self.lifecycle(kinds::TASK_FINISHED, &task));
            return Some(Transition { task, effects });
        }

        let wait = job.wait_for(task.step).cloned();
        let is_last = job.is_last_step(task.step);
        let progress = match task.action_succeeded(&name, wait.as_ref().map(|w| w.timeout), is_last, now) {
            Ok(progress) => progress,
            Err(e) => {
                tracing::warn!(error = %e, "completion not applied");
                return None;
            }
        };
        tracing::info!(%task_id, step = %name, ?progress, "step completed");
        match progress {
            Progress::Waiting => {
                if let Some(wait) = wait {
                    effects.push(Effect::SetTimer {
                        id: TimerId::wait_deadline(&task.id),
                        duration: wait.timeout,
                    });
                }
            }
            Progress::NextStep(next) => self.enter_step(&mut task, &job, next, &mut effects),
            Progress::Finished(_) => effects.push(self.lifecycle(kinds::TASK_FINISHED, &task)),
        }
        Some(Transition { task, effects })
    }

    /// Instances holding at a step right now.
    pub(crate) fn waiting_ids(&self) -> HashSet<TaskId> {
        self.live
            .values()
            .filter(|t| t.status == TaskStatus::Waiting)
            .map(|t| t.id.clone())
            .collect()
    }

    /// Waiting instances whose wait trigger matches.
    ///
    /// Only instances in `held` are considered: an instance that started
    /// waiting while the same stimulus was handled keeps waiting.
    pub(crate) fn waits_matching(
        &self,
        stimulus: &Stimulus<'_>,
        kind: &str,
        held: &HashSet<TaskId>,
    ) -> Vec<Transition> {
        let matched: Vec<TaskId> = self
            .live
            .values()
            .filter(|t| t.status == TaskStatus::Waiting && held.contains(&t.id))
            .filter(|t| {
                self.jobs
                    .get(&t.job_id)
                    .and_then(|job| job.wait_for(t.step))
                    .is_some_and(|wait| wait.trigger.matches(stimulus))
            })
            .map(|t| t.id.clone())
            .collect();

        matched
            .iter()
            .filter_map(|id| {
                self.end_wait(
                    id,
                    WaitOutcome::Triggered {
                        kind: kind.to_string(),
                    },
                )
            })
            .collect()
    }

    /// Leave `Waiting` by either path. Whichever path runs first wins;
    /// the instance is no longer waiting when the other arrives.
    pub(crate) fn end_wait(&self, task_id: &TaskId, outcome: WaitOutcome) -> Option<Transition> {
        let mut task = self.live.get(task_id)?.clone();
        if task.status != TaskStatus::Waiting {
            return None;
        }
        let Some(job) = self.jobs.get(&task.job_id) else {
            return Some(self.orphaned(task));
        };

        tracing::info!(%task_id, step = task.step, ?outcome, "wait ended");
        let is_last = job.is_last_step(task.step);
        let progress = match task.wait_ended(outcome, is_last, self.now_ms()) {
            Ok(progress) => progress,
            Err(e) => {
                tracing::warn!(error = %e, "wait end not applied");
                return None;
            }
        };

        let mut effects = vec![Effect::CancelTimer {
            id: TimerId::wait_deadline(&task.id),
        }];
        match progress {
            Progress::NextStep(next) => self.enter_step(&mut task, job, next, &mut effects),
            Progress::Finished(_) => effects.push(self.lifecycle(kinds::TASK_FINISHED, &task)),
            Progress::Waiting => {}
        }
        Some(Transition { task, effects })
    }

    /// A deadline elapsed.
    pub(crate) fn on_timer(&mut self, id: &TimerId) -> Option<Transition> {
        let Some((kind, task_id)) = id.parse() else {
            tracing::debug!(timer_id = %id, "ignoring unknown timer");
            return None;
        };
        match kind {
            TimerKind::WaitDeadline => self.end_wait(&task_id, WaitOutcome::TimedOut),
            TimerKind::StepTimeout => {
                let task = self.live.get(&task_id)?;
                if task.status != TaskStatus::Running {
                    return None;
                }
                let started = task.step_started_at_ms.unwrap_or(task.updated_at_ms);
                let elapsed = self.now_ms().saturating_sub(started);
                let step = task.step;
                let name = step_name(self.jobs.get(&task.job_id), step);
                self.fail_step(
                    &task_id,
                    step,
                    format!("step '{}' timed out after {}", name, format_elapsed_ms(elapsed)),
                )
            }
        }
    }

    /// Fail the current step of a running instance.
    pub(crate) fn fail_step(
        &mut self,
        task_id: &TaskId,
        step: usize,
        error: String,
    ) -> Option<Transition> {
        let mut task = self.live.get(task_id)?.clone();
        if task.status != TaskStatus::Running || task.step != step {
            return None;
        }
        let name = step_name(self.jobs.get(&task.job_id), step);
        let handle = task.handle.clone();
        if let Err(e) = task.fail(&name, error, self.now_ms()) {
            tracing::warn!(error = %e, "failure not applied");
            return None;
        }

        let mut effects = vec![Effect::CancelTimer {
            id: TimerId::step_timeout(&task.id),
        }];
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

    /// Move a running instance onto step `index` and dispatch it.
    pub(crate) fn enter_step(
        &self,
        task: &mut TaskInstance,
        job: &JobDescriptor,
        index: usize,
        effects: &mut Vec<Effect>,
    ) {
        let now = self.now_ms();
        let Some(step) = job.step(index) else {
            task.force_fail(format!("job {} has no step {}", job.id, index + 1), now);
            effects.push(self.lifecycle(kinds::TASK_FINISHED, task));
            return;
        };
        task.enter_step(index, step.timeout, now);
        effects.push(Effect::SetTimer {
            id: TimerId::step_timeout(&task.id),
            duration: step.timeout,
        });
        effects.push(Effect::Dispatch {
            task_id: task.id.clone(),
            job_id: job.id.clone(),
            step: index,
            action: step.action.clone(),
        });
    }

    /// A live instance whose descriptor is gone cannot progress.
    pub(crate) fn orphaned(&self, mut task: TaskInstance) -> Transition {
        tracing::warn!(task_id = %task.id, job_id = %task.job_id, "descriptor missing, failing task");
        task.force_fail(
            format!("job {} no longer exists", task.job_id),
            self.now_ms(),
        );
        let effects = vec![
            Effect::CancelTimer {
                id: TimerId::step_timeout(&task.id),
            },
            Effect::CancelTimer {
                id: TimerId::wait_deadline(&task.id),
            },
            self.lifecycle(kinds::TASK_FINISHED, &task),
        ];
        Transition { task, effects }
    }
}
