use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::StoreError;
use crate::alerts::EventCounter;
use crate::data::{ApplicationId, LogEvent, SeverityLevel};

/// Append-only log event store, partitioned by application
pub struct LogStore {
    events: DashMap<ApplicationId, Vec<LogEvent>>,
}

impl LogStore {
    pub fn new() -> Self {
        Self {
            events: DashMap::new(),
        }
    }

    /// Append a single event
    pub fn append(&self, event: LogEvent) {
        self.events
            .entry(event.application_id)
            .or_default()
            .push(event);
    }

    /// Append multiple events, returning how many were stored
    pub fn append_batch(&self, events: impl IntoIterator<Item = LogEvent>) -> usize {
        let mut appended = 0;
        for event in events {
            self.append(event);
            appended += 1;
        }
        appended
    }

    /// Count events for an application at `level` newer than `since` (exclusive)
    pub fn count_since(
        &self,
        application_id: ApplicationId,
        level: &str,
        since: DateTime<Utc>,
    ) -> u64 {
        self.events
            .get(&application_id)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.level == level && e.timestamp > since)
                    .count() as u64
            })
            .unwrap_or(0)
    }

    /// Total events across all applications
    pub fn len(&self) -> usize {
        self.events.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventCounter for LogStore {
    async fn count_matching(
        &self,
        application_id: ApplicationId,
        level: SeverityLevel,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Ok(self.count_since(application_id, level.as_str(), since))
    }
}
