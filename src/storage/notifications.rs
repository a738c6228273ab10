//! Notification inbox
//!
//! Rows are appended by fanout and only ever mutated by their recipient
//! flipping the read flag.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::StoreError;
use crate::alerts::NotificationSink;
use crate::data::{NewNotification, NotificationId, NotificationRecord, Page, PageRequest, UserId};

pub struct NotificationStore {
    records: RwLock<Vec<NotificationRecord>>,
    next_id: AtomicU64,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// A recipient's notifications, newest first
    pub fn list_for_recipient(&self, recipient: UserId, request: PageRequest) -> Page<NotificationRecord> {
        let mut mine: Vec<NotificationRecord> = self
            .records
            .read()
            .iter()
            .filter(|n| n.recipient == recipient)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Page::from_ordered(mine, request)
    }

    /// Mark a notification read on behalf of `caller`
    ///
    /// Marking an already-read notification again succeeds without change.
    pub fn mark_read(&self, caller: UserId, id: NotificationId) -> Result<(), NotificationError> {
        let mut records = self.records.write();
        let record = records
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(NotificationError::NotFound(id))?;

        if record.recipient != caller {
            return Err(NotificationError::Forbidden(id));
        }

        record.read = true;
        Ok(())
    }

    pub fn unread_count(&self, recipient: UserId) -> usize {
        self.records
            .read()
            .iter()
            .filter(|n| n.recipient == recipient && !n.read)
            .count()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for NotificationStore {
    async fn save_all(
        &self,
        notifications: Vec<NewNotification>,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let created_at = Utc::now();
        let saved: Vec<NotificationRecord> = notifications
            .into_iter()
            .map(|n| NotificationRecord {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                recipient: n.recipient,
                message: n.message,
                read: false,
                created_at,
                alert_id: n.alert_id,
            })
            .collect();

        // One lock acquisition makes the batch visible atomically
        self.records.write().extend(saved.iter().cloned());
        Ok(saved)
    }
}

/// Notification access errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification not found with ID: {0}")]
    NotFound(NotificationId),

    #[error("You do not have permission to access notification {0}")]
    Forbidden(NotificationId),
}
