// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine loop
//!
//! Suspends only in `select!` over control commands, bus events, and the
//! tick interval. Each stimulus is handled to completion before the next
//! is taken, so shutdown is observed between stimuli.

use crate::handle::{Command, EngineHandle};
use crate::runtime::Runtime;
use crate::RuntimeError;
use std::time::Duration;
use tally_adapters::{ActionExecutor, NotifyAdapter};
use tally_core::{Clock, IdGen, KindFilter, Subscription};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Queued control commands before senders wait.
const COMMAND_CAPACITY: usize = 64;

/// Ticks are never more frequent than this.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_secs(1);

pub struct Engine<X, N, C: Clock, G> {
    runtime: Runtime<X, N, C, G>,
    events: Subscription,
    commands: mpsc::Receiver<Command>,
    tick_interval: Duration,
}

impl<X, N, C, G> Engine<X, N, C, G>
where
    X: ActionExecutor,
    N: NotifyAdapter,
    C: Clock,
    G: IdGen,
{
    /// Wrap a runtime. The bus subscription is taken here, so events
    /// published from now on reach the loop even before `run`.
    pub fn new(runtime: Runtime<X, N, C, G>, tick_interval: Duration) -> (Self, EngineHandle) {
        let events = runtime.bus().subscribe(KindFilter::All);
        let (tx, commands) = mpsc::channel(COMMAND_CAPACITY);
        let handle = EngineHandle::new(tx, runtime.job_store(), runtime.task_store());
        let engine = Self {
            runtime,
            events,
            commands,
            tick_interval: tick_interval.max(MIN_TICK_INTERVAL),
        };
        (engine, handle)
    }

    pub fn runtime(&self) -> &Runtime<X, N, C, G> {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime<X, N, C, G> {
        &mut self.runtime
    }

    /// Resume persisted state. Call once, before `run`.
    pub async fn recover(&mut self) -> Result<usize, RuntimeError> {
        self.runtime.recover().await
    }

    /// Run until shutdown is requested, every handle is dropped, or the bus closes.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(tick_ms = self.tick_interval.as_millis() as u64, "engine loop started");

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => {
                    match command {
                        Some(Command::Shutdown) => {
                            tracing::info!("shutdown requested");
                            break;
                        }
                        Some(command) => self.handle_command(command).await,
                        None => {
                            tracing::info!("all engine handles dropped, stopping");
                            break;
                        }
                    }
                }

                event = self.events.recv() => {
                    match event {
                        Some(event) => self.runtime.handle_event(event).await,
                        None => {
                            tracing::info!("event bus closed, stopping");
                            break;
                        }
                    }
                }

                _ = ticker.tick() => self.runtime.tick().await,
            }
        }
        tracing::info!(live = self.runtime.live_tasks().count(), "engine loop stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        // A dropped receiver means the caller stopped waiting; nothing to do.
        match command {
            Command::Cancel { task_id, reply } => {
                let outcome = self.runtime.cancel(&task_id).await;
                let _ = reply.send(outcome);
            }
            Command::Trigger { job_id, reply } => {
                let outcome = self.runtime.trigger(&job_id).await;
                let _ = reply.send(outcome);
            }
            Command::DefineJobs { jobs, reply } => {
                let outcome = self.runtime.define_jobs(jobs).await;
                let _ = reply.send(outcome);
            }
            Command::RemoveJob { job_id, reply } => {
                let outcome = self.runtime.remove_job(&job_id).await;
                let _ = reply.send(outcome);
            }
            Command::Shutdown => {}
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
