use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ApplicationId;

/// A single ingested log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub application_id: ApplicationId,
    pub timestamp: DateTime<Utc>,
    /// Level as the emitter wrote it; alerts match it exactly
    pub level: String,
    #[serde(default)]
    pub message: String,
}

impl LogEvent {
    pub fn new(
        application_id: ApplicationId,
        level: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            application_id,
            timestamp,
            level: level.into(),
            message: String::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}
