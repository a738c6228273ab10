//! Trailing-window event counting

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use super::source::EventCounter;
use crate::data::AlertDefinition;
use crate::storage::StoreError;

/// Counts events matching an alert within its trailing window
#[derive(Clone)]
pub struct WindowCounter {
    backend: Arc<dyn EventCounter>,
}

impl WindowCounter {
    pub fn new(backend: Arc<dyn EventCounter>) -> Self {
        Self { backend }
    }

    /// Number of matching events strictly after `now - window`
    pub async fn count(&self, alert: &AlertDefinition, now: DateTime<Utc>) -> Result<u64, WindowError> {
        let since = window_start(alert, now)?;

        tracing::debug!(
            alert_id = alert.id,
            application = %alert.application.name,
            level = %alert.level,
            since = %since,
            "Counting events in window"
        );

        self.backend
            .count_matching(alert.application.id, alert.level, since)
            .await
            .map_err(WindowError::Store)
    }
}

/// Exclusive lower bound of an alert's window
pub fn window_start(alert: &AlertDefinition, now: DateTime<Utc>) -> Result<DateTime<Utc>, WindowError> {
    TimeDelta::from_std(alert.window)
        .ok()
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or(WindowError::OutOfRange(alert.id))
}

/// Window counting errors
#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("Window for alert {0} reaches outside the representable time range")]
    OutOfRange(u64),

    #[error("Count query failed: {0}")]
    Store(#[source] StoreError),
}
