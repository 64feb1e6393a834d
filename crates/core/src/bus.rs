// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide publish/subscribe event bus.
//!
//! Subscribers only see events published after they subscribed; there is no
//! replay. Each subscriber owns an unbounded queue, so a slow reader never
//! loses events and never blocks publishers.

use crate::event::Event;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("no subscribers for event {kind}")]
    NoSubscribers { kind: String },
}

/// Which event kinds a subscription receives.
#[derive(Debug, Clone, Default)]
pub enum KindFilter {
    #[default]
    All,
    Only(HashSet<String>),
}

impl KindFilter {
    pub fn only<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KindFilter::Only(kinds.into_iter().map(Into::into).collect())
    }

    pub fn accepts(&self, event: &Event) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Only(kinds) => kinds.contains(&event.kind),
        }
    }
}

#[derive(Debug)]
struct Subscriber {
    tx: mpsc::UnboundedSender<Event>,
    filter: KindFilter,
}

/// Cloneable handle to the bus.
///
/// Subscriptions end once every clone is dropped.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to current subscribers whose filter accepts it.
    /// Returns how many received it.
    ///
    /// Fails only when nobody is subscribed at all.
    pub fn publish(&self, event: Event) -> Result<usize, PublishError> {
        tracing::trace!(event = %event.log_summary(), "publish");
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|s| !s.tx.is_closed());
        if subscribers.is_empty() {
            return Err(PublishError::NoSubscribers { kind: event.kind });
        }

        let mut delivered = 0;
        for subscriber in subscribers.iter().filter(|s| s.filter.accepts(&event)) {
            if subscriber.tx.send(event.clone()).is_ok() {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    pub fn subscribe(&self, filter: KindFilter) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(Subscriber { tx, filter });
        Subscription { rx }
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|s| !s.tx.is_closed());
        subscribers.len()
    }
}

/// An infinite, non-restartable stream of matching events.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl Subscription {
    /// Next matching event. `None` once every bus handle is dropped.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Next matching event if one is already queued.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Drain every queued matching event.
    pub fn drain(&mut self) -> Vec<Event> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
