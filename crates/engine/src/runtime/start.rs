// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Starting task instances: trigger matching, concurrency, queued starts

use super::{Runtime, Transition};
use crate::error::RuntimeError;
use tally_adapters::{ActionExecutor, NotifyAdapter};
use tally_core::{
    kinds, Clock, Effect, IdGen, JobDescriptor, JobId, Stimulus, SurpassBehaviour, TaskId,
    TaskInstance, TaskStatus, TimerId,
};

/// What a start request led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started(TaskId),
    /// Held as `Pending` until a running instance finishes.
    Queued(TaskId),
    /// Dropped by the descriptor's concurrency policy.
    Skipped,
}

impl<X, N, C, G> Runtime<X, N, C, G>
where
    X: ActionExecutor,
    N: NotifyAdapter,
    C: Clock,
    G: IdGen,
{
    /// Manually start a descriptor, subject to its concurrency policy.
    pub async fn trigger(&mut self, job_id: &JobId) -> Result<StartOutcome, RuntimeError> {
        let (outcome, transitions) = self.start_job(job_id, "manual")?;
        self.apply(transitions).await;
        Ok(outcome)
    }

    /// Start every active descriptor whose trigger matches.
    pub(crate) fn start_matching(&mut self, stimulus: &Stimulus<'_>) -> Vec<Transition> {
        let matched: Vec<JobId> = self
            .jobs
            .values()
            .filter(|job| job.active && job.trigger.matches(stimulus))
            .map(|job| job.id.clone())
            .collect();

        let origin = match stimulus {
            Stimulus::Event(event) => event.kind.as_str(),
            Stimulus::Tick(_) => "schedule",
        };
        let mut transitions = Vec::new();
        for job_id in matched {
            match self.start_job(&job_id, origin) {
                Ok((_, started)) => transitions.extend(started),
                Err(e) => tracing::warn!(%job_id, error = %e, "start failed"),
            }
        }
        transitions
    }

    pub(crate) fn start_job(
        &mut self,
        job_id: &JobId,
        origin: &str,
    ) -> Result<(StartOutcome, Vec<Transition>), RuntimeError> {
        let job = self
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| RuntimeError::JobNotFound(job_id.clone()))?;
        if !job.active {
            return Err(RuntimeError::JobInactive(job_id.clone()));
        }

        let mut running = self.running_tasks(job_id);
        let limit = job.concurrency as usize;
        let mut transitions = Vec::new();

        if running.len() >= limit {
            match job.on_surpass {
                SurpassBehaviour::Skip => {
                    tracing::info!(%job_id, origin, running = running.len(), "start skipped, concurrency limit reached");
                    return Ok((StartOutcome::Skipped, transitions));
                }
                SurpassBehaviour::Wait => {
                    if self.queued.get(job_id).is_some_and(|q| !q.is_empty()) {
                        tracing::info!(%job_id, origin, "start dropped, one is already queued");
                        return Ok((StartOutcome::Skipped, transitions));
                    }
                    let task = self.new_task(job_id);
                    let id = task.id.clone();
                    self.queued
                        .entry(job_id.clone())
                        .or_default()
                        .push_back(id.clone());
                    tracing::info!(%job_id, task_id = %id, origin, "start queued");
                    transitions.push(Transition {
                        task,
                        effects: Vec::new(),
                    });
                    return Ok((StartOutcome::Queued(id), transitions));
                }
                SurpassBehaviour::Replace => {
                    let excess = running.len() + 1 - limit;
                    for old in running.drain(..excess) {
                        tracing::info!(%job_id, task_id = %old, origin, "replacing oldest run");
                        if let Some(t) = self.cancel_transition(&old, "replaced by a newer run") {
                            transitions.push(t);
                        }
                    }
                }
            }
        }

        let task = self.new_task(job_id);
        let id = task.id.clone();
        transitions.push(self.begin_task(task, &job)?);
        tracing::info!(%job_id, task_id = %id, origin, "task started");
        Ok((StartOutcome::Started(id), transitions))
    }

    /// Start queued instances of `job_id` while capacity allows.
    pub(crate) fn release_queued(&mut self, job_id: &JobId) -> Vec<Transition> {
        let mut transitions = Vec::new();
        let Some(job) = self.jobs.get(job_id).cloned() else {
            return transitions;
        };
        if !job.active {
            return transitions;
        }
        let mut running = self.running_tasks(job_id).len();
        while running < job.concurrency as usize {
            let Some(id) = self.queued.get_mut(job_id).and_then(|q| q.pop_front()) else {
                break;
            };
            let Some(task) = self.live.get(&id).cloned() else {
                continue;
            };
            match self.begin_task(task, &job) {
                Ok(t) => {
                    tracing::info!(%job_id, task_id = %id, "queued task started");
                    transitions.push(t);
                    running += 1;
                }
                Err(e) => tracing::warn!(%job_id, task_id = %id, error = %e, "queued start failed"),
            }
        }
        if self.queued.get(job_id).is_some_and(|q| q.is_empty()) {
            self.queued.remove(job_id);
        }
        transitions
    }

    /// Running or waiting instances of a descriptor, oldest first.
    fn running_tasks(&self, job_id: &JobId) -> Vec<TaskId> {
        let mut tasks: Vec<&TaskInstance> = self
            .live
            .values()
            .filter(|t| &t.job_id == job_id && t.status != TaskStatus::Pending)
            .collect();
        tasks.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        });
        tasks.into_iter().map(|t| t.id.clone()).collect()
    }

    fn new_task(&self, job_id: &JobId) -> TaskInstance {
        TaskInstance::new(TaskId::new(self.ids.next()), job_id.clone(), self.now_ms())
    }

    /// `Pending -> Running` at step 0, with its deadline and dispatch.
    fn begin_task(
        &self,
        mut task: TaskInstance,
        job: &JobDescriptor,
    ) -> Result<Transition, RuntimeError> {
        let step = job.step(0).ok_or_else(|| tally_core::ValidationError::NoSteps {
            job: job.id.to_string(),
        })?;
        task.begin(step.timeout, self.now_ms())?;
        let effects = vec![
            self.lifecycle(kinds::TASK_STARTED, &task),
            Effect::SetTimer {
                id: TimerId::step_timeout(&task.id),
                duration: step.timeout,
            },
            Effect::Dispatch {
                task_id: task.id.clone(),
                job_id: job.id.clone(),
                step: 0,
                action: step.action.clone(),
            },
        ];
        Ok(Transition { task, effects })
    }
}
