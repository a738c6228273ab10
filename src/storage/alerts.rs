//! Alert definition store
//!
//! Validation and the duplicate check run under the same write lock as the
//! insert, so two concurrent creates can never both land on one tuple.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{ApplicationStore, StoreError};
use crate::alerts::AlertSource;
use crate::data::{
    AlertDefinition, AlertId, AlertSpec, ApplicationId, Page, PageRequest, SeverityLevel, UserId,
    MAX_THRESHOLD,
};

#[derive(Debug, Clone)]
struct StoredAlert {
    id: AlertId,
    spec: AlertSpec,
    created_by: UserId,
    updated_at: DateTime<Utc>,
}

/// Changes applied by [`AlertStore::update`]; `active` is left alone when `None`
#[derive(Debug, Clone)]
pub struct AlertUpdate {
    pub application_id: ApplicationId,
    pub level: SeverityLevel,
    pub threshold: u32,
    pub window: Duration,
    pub active: Option<bool>,
}

/// Store of alert definitions
pub struct AlertStore {
    applications: Arc<ApplicationStore>,
    alerts: RwLock<BTreeMap<AlertId, StoredAlert>>,
    next_id: AtomicU64,
}

impl AlertStore {
    pub fn new(applications: Arc<ApplicationStore>) -> Self {
        Self {
            applications,
            alerts: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a definition owned by `created_by`
    pub fn create(&self, spec: AlertSpec, created_by: UserId) -> Result<AlertDefinition, AlertError> {
        self.validate(&spec)?;

        let mut alerts = self.alerts.write();
        Self::check_duplicate(&alerts, &spec, None)?;

        let stored = StoredAlert {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            spec,
            created_by,
            updated_at: Utc::now(),
        };
        alerts.insert(stored.id, stored.clone());
        drop(alerts);

        tracing::info!(alert_id = stored.id, created_by, "Alert created");
        self.join(&stored)
    }

    /// Update every field except the creator
    pub fn update(&self, id: AlertId, changes: AlertUpdate) -> Result<AlertDefinition, AlertError> {
        let mut alerts = self.alerts.write();
        let existing = alerts.get(&id).ok_or(AlertError::NotFound(id))?;

        let spec = AlertSpec {
            application_id: changes.application_id,
            level: changes.level,
            threshold: changes.threshold,
            window: changes.window,
            active: changes.active.unwrap_or(existing.spec.active),
        };
        self.validate(&spec)?;
        Self::check_duplicate(&alerts, &spec, Some(id))?;

        if let Some(active) = changes.active {
            tracing::info!(
                alert_id = id,
                "Alert status changed to {}",
                if active { "ACTIVE" } else { "INACTIVE" }
            );
        }

        let stored = alerts.get_mut(&id).ok_or(AlertError::NotFound(id))?;
        stored.spec = spec;
        stored.updated_at = Utc::now();
        let stored = stored.clone();
        drop(alerts);

        self.join(&stored)
    }

    pub fn get(&self, id: AlertId) -> Option<AlertDefinition> {
        let stored = self.alerts.read().get(&id).cloned()?;
        self.join(&stored).ok()
    }

    /// Page of definitions, most recently updated first
    pub fn list(&self, request: PageRequest) -> Page<AlertDefinition> {
        let newest_first =
            self.joined_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Page::from_ordered(newest_first, request)
    }

    fn joined_by(
        &self,
        order: impl FnMut(&StoredAlert, &StoredAlert) -> std::cmp::Ordering,
    ) -> Vec<AlertDefinition> {
        let mut stored: Vec<StoredAlert> = self.alerts.read().values().cloned().collect();
        stored.sort_by(order);
        stored.iter().filter_map(|s| self.join(s).ok()).collect()
    }

    fn validate(&self, spec: &AlertSpec) -> Result<(), AlertError> {
        if spec.threshold == 0 || spec.threshold > MAX_THRESHOLD {
            return Err(AlertError::InvalidThreshold(spec.threshold));
        }
        if spec.window.is_zero() {
            return Err(AlertError::InvalidWindow);
        }
        if self.applications.get(spec.application_id).is_none() {
            return Err(AlertError::UnknownApplication(spec.application_id));
        }
        Ok(())
    }

    fn check_duplicate(
        alerts: &BTreeMap<AlertId, StoredAlert>,
        spec: &AlertSpec,
        exclude: Option<AlertId>,
    ) -> Result<(), AlertError> {
        if !spec.active {
            return Ok(());
        }

        let clash = alerts.values().find(|a| {
            Some(a.id) != exclude && a.spec.active && a.spec.identity() == spec.identity()
        });

        match clash {
            Some(existing) => Err(AlertError::Duplicate {
                existing: existing.id,
            }),
            None => Ok(()),
        }
    }

    fn join(&self, stored: &StoredAlert) -> Result<AlertDefinition, AlertError> {
        let application = self
            .applications
            .get(stored.spec.application_id)
            .ok_or(AlertError::UnknownApplication(stored.spec.application_id))?;

        Ok(AlertDefinition {
            id: stored.id,
            application,
            level: stored.spec.level,
            threshold: stored.spec.threshold,
            window: stored.spec.window,
            created_by: stored.created_by,
            active: stored.spec.active,
            updated_at: stored.updated_at,
        })
    }
}

#[async_trait]
impl AlertSource for AlertStore {
    async fn list_all(&self) -> Result<Vec<AlertDefinition>, StoreError> {
        Ok(self.joined_by(|a, b| a.id.cmp(&b.id)))
    }
}

/// Alert definition errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlertError {
    #[error("Alert not found with ID: {0}")]
    NotFound(AlertId),

    #[error("Application not found with ID: {0}")]
    UnknownApplication(ApplicationId),

    #[error("Count must be between 1 and 10000 (got {0})")]
    InvalidThreshold(u32),

    #[error("Time window must be greater than zero")]
    InvalidWindow,

    #[error("An alert with the same configuration already exists for this application (alert {existing})")]
    Duplicate { existing: AlertId },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (AlertStore, ApplicationId) {
        let apps = Arc::new(ApplicationStore::new());
        let app = apps.create("billing");
        (AlertStore::new(apps), app.id)
    }

    fn spec(app: ApplicationId) -> AlertSpec {
        AlertSpec::new(app, SeverityLevel::Error, 5, Duration::from_secs(300))
    }

    #[test]
    fn test_create_and_get() {
        let (store, app) = setup();
        let alert = store.create(spec(app), 7).unwrap();

        let fetched = store.get(alert.id).unwrap();
        assert_eq!(fetched.application.name, "billing");
        assert_eq!(fetched.created_by, 7);
        assert!(fetched.active);
    }

    #[test]
    fn test_duplicate_active_tuple_rejected() {
        let (store, app) = setup();
        let first = store.create(spec(app), 1).unwrap();

        assert_eq!(
            store.create(spec(app), 2).unwrap_err(),
            AlertError::Duplicate { existing: first.id }
        );

        // A different window is a different tuple
        let mut other = spec(app);
        other.window = Duration::from_secs(600);
        assert!(store.create(other, 2).is_ok());
    }

    #[test]
    fn test_inactive_definitions_do_not_collide() {
        let (store, app) = setup();
        let first = store.create(spec(app), 1).unwrap();
        store
            .update(
                first.id,
                AlertUpdate {
                    application_id: app,
                    level: SeverityLevel::Error,
                    threshold: 5,
                    window: Duration::from_secs(300),
                    active: Some(false),
                },
            )
            .unwrap();

        assert!(store.create(spec(app), 1).is_ok());
        assert!(store.create(spec(app).with_active(false), 1).is_ok());
    }

    #[test]
    fn test_update_into_existing_tuple_rejected() {
        let (store, app) = setup();
        let first = store.create(spec(app), 1).unwrap();
        let mut other = spec(app);
        other.threshold = 10;
        let second = store.create(other, 1).unwrap();

        let err = store
            .update(
                second.id,
                AlertUpdate {
                    application_id: app,
                    level: SeverityLevel::Error,
                    threshold: 5,
                    window: Duration::from_secs(300),
                    active: None,
                },
            )
            .unwrap_err();
        assert_eq!(err, AlertError::Duplicate { existing: first.id });

        // Re-saving an alert's own tuple is not a clash
        let same = store
            .update(
                first.id,
                AlertUpdate {
                    application_id: app,
                    level: SeverityLevel::Error,
                    threshold: 5,
                    window: Duration::from_secs(300),
                    active: None,
                },
            )
            .unwrap();
        assert_eq!(same.created_by, 1);
        assert!(same.active);
    }

    #[test]
    fn test_validation() {
        let (store, app) = setup();

        let mut zero = spec(app);
        zero.threshold = 0;
        assert_eq!(store.create(zero, 1).unwrap_err(), AlertError::InvalidThreshold(0));

        let mut huge = spec(app);
        huge.threshold = MAX_THRESHOLD + 1;
        assert!(matches!(store.create(huge, 1), Err(AlertError::InvalidThreshold(_))));

        let mut no_window = spec(app);
        no_window.window = Duration::ZERO;
        assert_eq!(store.create(no_window, 1).unwrap_err(), AlertError::InvalidWindow);

        assert_eq!(
            store.create(spec(999), 1).unwrap_err(),
            AlertError::UnknownApplication(999)
        );
    }

    #[test]
    fn test_update_missing_alert() {
        let (store, app) = setup();
        let err = store
            .update(
                42,
                AlertUpdate {
                    application_id: app,
                    level: SeverityLevel::Info,
                    threshold: 1,
                    window: Duration::from_secs(60),
                    active: None,
                },
            )
            .unwrap_err();
        assert_eq!(err, AlertError::NotFound(42));
    }

    #[tokio::test]
    async fn test_list_all_includes_inactive() {
        let (store, app) = setup();
        store.create(spec(app), 1).unwrap();
        store.create(spec(app).with_active(false), 1).unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(store.list(PageRequest::new(0, 1)).total_pages, 2);
    }
}
