use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::StoreError;
use crate::data::{Application, ApplicationId};

/// Registry of applications alerts can be attached to
pub struct ApplicationStore {
    applications: DashMap<ApplicationId, Application>,
    next_id: AtomicU64,
}

impl ApplicationStore {
    pub fn new() -> Self {
        Self {
            applications: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new, active application
    pub fn create(&self, name: impl Into<String>) -> Application {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.insert(Application {
            id,
            name: name.into(),
            active: true,
        })
    }

    /// Insert an application with a caller-chosen id
    pub fn insert(&self, application: Application) -> Application {
        self.next_id.fetch_max(application.id + 1, Ordering::SeqCst);
        self.applications
            .insert(application.id, application.clone());
        application
    }

    pub fn get(&self, id: ApplicationId) -> Option<Application> {
        self.applications.get(&id).map(|a| a.clone())
    }

    pub fn set_active(&self, id: ApplicationId, active: bool) -> Result<Application, StoreError> {
        let mut app = self
            .applications
            .get_mut(&id)
            .ok_or(StoreError::NotFound {
                kind: "Application",
                id,
            })?;
        app.active = active;
        Ok(app.clone())
    }

    pub fn list(&self) -> Vec<Application> {
        let mut apps: Vec<Application> = self.applications.iter().map(|a| a.clone()).collect();
        apps.sort_by_key(|a| a.id);
        apps
    }
}

impl Default for ApplicationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_assigns_ids() {
        let store = ApplicationStore::new();
        let a = store.create("billing");
        let b = store.create("search");

        assert_ne!(a.id, b.id);
        assert!(store.get(a.id).unwrap().active);
    }

    #[test]
    fn test_insert_with_explicit_id() {
        let store = ApplicationStore::new();
        store.insert(Application {
            id: 42,
            name: "AppName".to_string(),
            active: true,
        });

        assert_eq!(store.get(42).unwrap().name, "AppName");
        assert!(store.create("next").id > 42);
    }

    #[test]
    fn test_set_active() {
        let store = ApplicationStore::new();
        let app = store.create("billing");

        let updated = store.set_active(app.id, false).unwrap();
        assert!(!updated.active);
        assert!(matches!(
            store.set_active(999, true),
            Err(StoreError::NotFound { .. })
        ));
    }
}
