//! Notification fanout for triggered alerts

use std::collections::BTreeSet;
use std::sync::Arc;

use super::source::{NotificationSink, PermissionSource};
use crate::data::{AlertDefinition, NewNotification};
use crate::storage::StoreError;

/// Resolves recipients for a triggered alert and persists one notification each
#[derive(Clone)]
pub struct NotificationFanout {
    permissions: Arc<dyn PermissionSource>,
    sink: Arc<dyn NotificationSink>,
}

impl NotificationFanout {
    pub fn new(permissions: Arc<dyn PermissionSource>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { permissions, sink }
    }

    /// Notify every user with an ACTIVE grant on the alert's application
    ///
    /// Returns the number of notifications written. No recipients is not an
    /// error: the alert is valid, the application just has nobody assigned.
    pub async fn dispatch(&self, alert: &AlertDefinition, count: u64) -> Result<usize, FanoutError> {
        let recipients: BTreeSet<_> = self
            .permissions
            .active_users_for(alert.application.id)
            .await
            .map_err(FanoutError::Recipients)?
            .into_iter()
            .collect();

        if recipients.is_empty() {
            tracing::warn!(
                alert_id = alert.id,
                application = %alert.application.name,
                "Alert triggered, but no active users have permissions for the application"
            );
            return Ok(0);
        }

        let message = alert.breach_message(count);
        let batch: Vec<NewNotification> = recipients
            .into_iter()
            .map(|recipient| NewNotification {
                recipient,
                message: message.clone(),
                alert_id: alert.id,
            })
            .collect();

        let saved = self.sink.save_all(batch).await.map_err(FanoutError::Persist)?;

        tracing::info!(
            alert_id = alert.id,
            notifications = saved.len(),
            "Created notifications for triggered alert"
        );

        Ok(saved.len())
    }
}

/// Fanout errors
#[derive(Debug, thiserror::Error)]
pub enum FanoutError {
    #[error("Recipient lookup failed: {0}")]
    Recipients(#[source] StoreError),

    #[error("Notification write failed: {0}")]
    Persist(#[source] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Application, NotificationRecord, PageRequest, SeverityLevel};
    use crate::storage::{NotificationStore, PermissionStore};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::time::Duration;

    struct FailingSink;

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn save_all(
            &self,
            _notifications: Vec<NewNotification>,
        ) -> Result<Vec<NotificationRecord>, StoreError> {
            Err(StoreError::Unavailable("disk full".to_string()))
        }
    }

    fn alert() -> AlertDefinition {
        AlertDefinition {
            id: 9,
            application: Application {
                id: 42,
                name: "AppName".to_string(),
                active: true,
            },
            level: SeverityLevel::Error,
            threshold: 5,
            window: Duration::from_secs(300),
            created_by: 1,
            active: true,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_one_notification_per_active_user() {
        let permissions = Arc::new(PermissionStore::new());
        permissions.grant(1, 42);
        permissions.grant(2, 42);
        permissions.grant(3, 42);
        permissions.revoke(3, 42);
        permissions.grant(4, 7);
        let sink = Arc::new(NotificationStore::new());

        let fanout = NotificationFanout::new(permissions, sink.clone());
        assert_eq!(fanout.dispatch(&alert(), 6).await.unwrap(), 2);

        for user in [1, 2] {
            let page = sink.list_for_recipient(user, PageRequest::new(0, 10));
            assert_eq!(page.content.len(), 1);
            assert_eq!(
                page.content[0].message,
                "Alert for 'AppName': Found 6 logs with level 'ERROR', exceeding the threshold of 5."
            );
            assert_eq!(page.content[0].alert_id, 9);
        }
        assert_eq!(sink.list_for_recipient(3, PageRequest::new(0, 10)).total_elements, 0);
        assert_eq!(sink.list_for_recipient(4, PageRequest::new(0, 10)).total_elements, 0);
    }

    #[tokio::test]
    async fn test_no_recipients_is_not_an_error() {
        let sink = Arc::new(NotificationStore::new());
        let fanout = NotificationFanout::new(Arc::new(PermissionStore::new()), sink.clone());

        assert_eq!(fanout.dispatch(&alert(), 6).await.unwrap(), 0);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_sink_failure_surfaces() {
        let permissions = Arc::new(PermissionStore::new());
        permissions.grant(1, 42);
        let fanout = NotificationFanout::new(permissions, Arc::new(FailingSink));

        assert!(matches!(
            fanout.dispatch(&alert(), 6).await,
            Err(FanoutError::Persist(_))
        ));
    }
}
