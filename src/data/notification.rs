//! Notification, permission and paging types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AlertId, ApplicationId, NotificationId, UserId};

/// A notification row produced by a fanout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub recipient: UserId,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub alert_id: AlertId,
}

/// Notification awaiting persistence; the sink assigns id and creation time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub recipient: UserId,
    pub message: String,
    pub alert_id: AlertId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GrantStatus {
    Active,
    Revoked,
}

/// A user's access to an application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub user: UserId,
    pub application: ApplicationId,
    pub status: GrantStatus,
}

/// Zero-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl PageRequest {
    pub fn new(page: usize, size: usize) -> Self {
        Self { page, size }
    }

    fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

/// One page of an ordered result set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total_elements: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Slice an already-ordered collection
    pub fn from_ordered(items: impl IntoIterator<Item = T>, request: PageRequest) -> Self {
        let items: Vec<T> = items.into_iter().collect();
        let total_elements = items.len();
        let total_pages = if request.size == 0 {
            0
        } else {
            total_elements.div_ceil(request.size)
        };

        let content = items
            .into_iter()
            .skip(request.offset())
            .take(request.size)
            .collect();

        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_slicing() {
        let page = Page::from_ordered(0..25, PageRequest::new(1, 10));
        assert_eq!(page.content, (10..20).collect::<Vec<_>>());
        assert_eq!(page.total_elements, 25);
        assert_eq!(page.total_pages, 3);

        let last = Page::from_ordered(0..25, PageRequest::new(2, 10));
        assert_eq!(last.content.len(), 5);

        let past_end = Page::from_ordered(0..25, PageRequest::new(9, 10));
        assert!(past_end.content.is_empty());
    }
}
