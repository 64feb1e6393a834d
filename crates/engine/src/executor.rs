// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effect executor

use crate::Scheduler;
use tally_adapters::{ActionExecutor, ActionHandle, DispatchRequest, NotifyAdapter};
use tally_core::{Clock, Effect, EventBus, JobId, OperatorAlert, TaskId, TracedEffect};
use tracing::Instrument;

/// Outcome of an effect that the runtime must react to.
#[derive(Debug, Clone, PartialEq)]
pub enum Feedback {
    /// The executor accepted a step's action.
    Dispatched {
        task_id: TaskId,
        step: usize,
        handle: ActionHandle,
    },
    /// The executor refused a step's action.
    DispatchRejected {
        task_id: TaskId,
        job_id: JobId,
        step: usize,
        reason: String,
    },
}

/// Executes effects using the configured adapters
pub struct Executor<X, N, C: Clock> {
    actions: X,
    notifier: N,
    bus: EventBus,
    scheduler: Scheduler,
    clock: C,
}

impl<X, N, C> Executor<X, N, C>
where
    X: ActionExecutor,
    N: NotifyAdapter,
    C: Clock,
{
    pub fn new(actions: X, notifier: N, bus: EventBus, clock: C) -> Self {
        Self {
            actions,
            notifier,
            bus,
            scheduler: Scheduler::new(),
            clock,
        }
    }

    /// Get a reference to the clock
    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub(crate) fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Execute a single effect with tracing
    ///
    /// Returns feedback the runtime must feed back into its state machines.
    pub async fn execute(&mut self, effect: Effect) -> Option<Feedback> {
        let op_name = effect.name();
        let span = tracing::info_span!("effect", effect = op_name);

        async {
            tracing::info!(fields = ?effect.fields(), "executing");

            let start = std::time::Instant::now();
            let feedback = self.execute_inner(effect).await;
            let elapsed = start.elapsed();

            tracing::info!(
                elapsed_ms = elapsed.as_millis() as u64,
                has_feedback = feedback.is_some(),
                "completed"
            );
            feedback
        }
        .instrument(span)
        .await
    }

    /// Execute effects in order, collecting feedback
    pub async fn execute_all(&mut self, effects: Vec<Effect>) -> Vec<Feedback> {
        let mut feedback = Vec::new();
        for effect in effects {
            if let Some(f) = self.execute(effect).await {
                feedback.push(f);
            }
        }
        feedback
    }

    /// Inner execution logic for a single effect
    async fn execute_inner(&mut self, effect: Effect) -> Option<Feedback> {
        match effect {
            Effect::Emit { event } => {
                let summary = event.log_summary();
                if let Err(e) = self.bus.publish(event) {
                    tracing::debug!(event = %summary, error = %e, "event had no listeners");
                }
                None
            }

            Effect::Dispatch {
                task_id,
                job_id,
                step,
                action,
            } => {
                let request = DispatchRequest {
                    task_id: task_id.clone(),
                    job_id: job_id.clone(),
                    step,
                    action,
                };
                match self.actions.dispatch(request).await {
                    Ok(handle) => Some(Feedback::Dispatched {
                        task_id,
                        step,
                        handle,
                    }),
                    Err(e) => Some(Feedback::DispatchRejected {
                        task_id,
                        job_id,
                        step,
                        reason: e.to_string(),
                    }),
                }
            }

            Effect::CancelWork { task_id: _, handle } => {
                self.actions.cancel(&ActionHandle::new(handle)).await;
                None
            }

            Effect::SetTimer { id, duration } => {
                let now = self.clock.now();
                self.scheduler.set_timer(id, duration, now);
                None
            }

            Effect::CancelTimer { id } => {
                self.scheduler.cancel_timer(&id);
                None
            }

            Effect::Notify {
                title,
                message,
                task_id,
            } => {
                let alert = OperatorAlert {
                    title,
                    message,
                    task_id: task_id.map(|id| id.to_string()),
                };
                if let Err(e) = self.notifier.notify(&alert).await {
                    tracing::warn!(error = %e, title = %alert.title, "operator alert not delivered");
                }
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
