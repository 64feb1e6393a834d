// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot start of configured jobs once a subscriber shows up

use super::Runtime;
use std::time::Duration;
use tally_adapters::{ActionExecutor, NotifyAdapter};
use tally_core::event::SubscriberConnected;
use tally_core::{Clock, Event, IdGen, JobId};

/// Jobs to trigger once, when a subscriber joins `channel` or after
/// `timeout`, whichever comes first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOnSubscriber {
    pub channel: String,
    pub timeout: Duration,
    pub jobs: Vec<JobId>,
}

impl<X, N, C, G> Runtime<X, N, C, G>
where
    X: ActionExecutor,
    N: NotifyAdapter,
    C: Clock,
    G: IdGen,
{
    pub(crate) async fn on_subscriber_connected(&mut self, event: &Event) {
        let Some((config, _)) = &self.subscriber_start else {
            return;
        };
        let connected: SubscriberConnected = match event.decode() {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "malformed subscriber event ignored");
                return;
            }
        };
        if connected.channels.iter().any(|c| *c == config.channel) {
            self.start_for_subscriber("subscriber connected").await;
        }
    }

    pub(crate) async fn check_subscriber_deadline(&mut self) {
        let Some((_, deadline)) = &self.subscriber_start else {
            return;
        };
        if self.clock().now() >= *deadline {
            self.start_for_subscriber("no subscriber before timeout").await;
        }
    }

    async fn start_for_subscriber(&mut self, reason: &str) {
        let Some((config, _)) = self.subscriber_start.take() else {
            return;
        };
        tracing::info!(channel = %config.channel, reason, jobs = config.jobs.len(), "starting subscriber jobs");
        for job_id in &config.jobs {
            match self.start_job(job_id, "subscriber") {
                Ok((outcome, transitions)) => {
                    tracing::debug!(%job_id, ?outcome, "subscriber start");
                    self.apply(transitions).await;
                }
                Err(e) => tracing::warn!(%job_id, error = %e, "subscriber start failed"),
            }
        }
    }
}
