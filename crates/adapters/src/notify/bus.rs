// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus notification adapter.
//!
//! Publishes alerts as `operator-alert` events so any connected operator
//! surface can pick them up. Alerts are always logged at error level as
//! well, since nobody may be listening.

use super::{NotifyAdapter, NotifyError};
use async_trait::async_trait;
use tally_core::{kinds, Event, EventBus, OperatorAlert};

#[derive(Clone, Debug)]
pub struct BusNotifyAdapter {
    bus: EventBus,
}

impl BusNotifyAdapter {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl NotifyAdapter for BusNotifyAdapter {
    async fn notify(&self, alert: &OperatorAlert) -> Result<(), NotifyError> {
        tracing::error!(
            title = %alert.title,
            task_id = alert.task_id.as_deref().unwrap_or("-"),
            "{}",
            alert.message
        );
        let payload =
            serde_json::to_value(alert).map_err(|e| NotifyError::SendFailed(e.to_string()))?;
        self.bus
            .publish(Event::new(kinds::OPERATOR_ALERT, payload))
            .map(|_| ())
            .map_err(|e| NotifyError::SendFailed(e.to_string()))
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
