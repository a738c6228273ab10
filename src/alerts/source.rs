//! Collaborator interfaces consumed by the detection engine
//!
//! Each trait is one external dependency of the engine: where definitions
//! come from, how events are counted, who may receive a notification, and
//! where notifications are written. The in-memory stores in
//! [`crate::storage`] implement all four.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::data::{
    AlertDefinition, ApplicationId, NewNotification, NotificationRecord, SeverityLevel, UserId,
};
use crate::storage::StoreError;

/// Source of alert definitions
#[async_trait]
pub trait AlertSource: Send + Sync {
    /// Every definition, active or not, joined with its application
    async fn list_all(&self) -> Result<Vec<AlertDefinition>, StoreError>;
}

/// Backend able to count events in a trailing window
#[async_trait]
pub trait EventCounter: Send + Sync {
    /// Count events for `application_id` at `level` with timestamp strictly after `since`
    async fn count_matching(
        &self,
        application_id: ApplicationId,
        level: SeverityLevel,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError>;
}

/// Lookup of users eligible to receive notifications for an application
#[async_trait]
pub trait PermissionSource: Send + Sync {
    /// Distinct users holding an ACTIVE grant
    async fn active_users_for(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<UserId>, StoreError>;
}

/// Destination for fanned-out notifications
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Persist the whole batch or nothing
    async fn save_all(
        &self,
        notifications: Vec<NewNotification>,
    ) -> Result<Vec<NotificationRecord>, StoreError>;
}
