//! Alert definition types

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::duration::iso8601_serde;
use super::{AlertId, ApplicationId, UserId};

/// Upper bound on a definition's threshold count
pub const MAX_THRESHOLD: u32 = 10_000;

/// Severity level an alert watches for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SeverityLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl SeverityLevel {
    pub const ALL: [SeverityLevel; 4] = [
        SeverityLevel::Error,
        SeverityLevel::Warning,
        SeverityLevel::Info,
        SeverityLevel::Debug,
    ];

    /// Level as it appears on ingested log events
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLevel::Error => "ERROR",
            SeverityLevel::Warning => "WARNING",
            SeverityLevel::Info => "INFO",
            SeverityLevel::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeverityLevel {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SeverityLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| UnknownSeverity(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Severity level must be one of: ERROR, WARNING, INFO, DEBUG (got '{0}')")]
pub struct UnknownSeverity(pub String);

/// Application that log events and alerts belong to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub name: String,
    pub active: bool,
}

/// A stored threshold rule, joined with its owning application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertDefinition {
    pub id: AlertId,
    pub application: Application,
    pub level: SeverityLevel,
    /// Minimum number of matching events that constitutes a breach
    pub threshold: u32,
    #[serde(with = "iso8601_serde")]
    pub window: Duration,
    pub created_by: UserId,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

impl AlertDefinition {
    /// Whether the detector should evaluate this definition at all
    pub fn is_evaluable(&self) -> bool {
        self.active && self.application.active
    }

    /// Text delivered to every recipient when this alert fires
    pub fn breach_message(&self, count: u64) -> String {
        format!(
            "Alert for '{}': Found {} logs with level '{}', exceeding the threshold of {}.",
            self.application.name, count, self.level, self.threshold
        )
    }
}

/// Caller-supplied fields of a definition (everything but id, creator and timestamps)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertSpec {
    pub application_id: ApplicationId,
    pub level: SeverityLevel,
    pub threshold: u32,
    pub window: Duration,
    pub active: bool,
}

impl AlertSpec {
    pub fn new(
        application_id: ApplicationId,
        level: SeverityLevel,
        threshold: u32,
        window: Duration,
    ) -> Self {
        Self {
            application_id,
            level,
            threshold,
            window,
            active: true,
        }
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Tuple that must be unique among active definitions
    pub fn identity(&self) -> (ApplicationId, SeverityLevel, u32, Duration) {
        (self.application_id, self.level, self.threshold, self.window)
    }
}
