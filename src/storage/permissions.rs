use std::collections::BTreeSet;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::StoreError;
use crate::alerts::PermissionSource;
use crate::data::{ApplicationId, GrantStatus, PermissionGrant, UserId};

/// User-to-application access grants
pub struct PermissionStore {
    grants: RwLock<Vec<PermissionGrant>>,
}

impl PermissionStore {
    pub fn new() -> Self {
        Self {
            grants: RwLock::new(Vec::new()),
        }
    }

    /// Grant (or re-activate) access for a user
    pub fn grant(&self, user: UserId, application: ApplicationId) {
        let mut grants = self.grants.write();
        if let Some(existing) = grants
            .iter_mut()
            .find(|g| g.user == user && g.application == application)
        {
            existing.status = GrantStatus::Active;
            return;
        }
        grants.push(PermissionGrant {
            user,
            application,
            status: GrantStatus::Active,
        });
    }

    /// Revoke access; returns false when the user never had a grant
    pub fn revoke(&self, user: UserId, application: ApplicationId) -> bool {
        let mut grants = self.grants.write();
        match grants
            .iter_mut()
            .find(|g| g.user == user && g.application == application)
        {
            Some(existing) => {
                existing.status = GrantStatus::Revoked;
                true
            }
            None => false,
        }
    }

    pub fn grants_for(&self, application: ApplicationId) -> Vec<PermissionGrant> {
        self.grants
            .read()
            .iter()
            .filter(|g| g.application == application)
            .cloned()
            .collect()
    }
}

impl Default for PermissionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermissionSource for PermissionStore {
    async fn active_users_for(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<UserId>, StoreError> {
        let users: BTreeSet<UserId> = self
            .grants
            .read()
            .iter()
            .filter(|g| g.application == application_id && g.status == GrantStatus::Active)
            .map(|g| g.user)
            .collect();
        Ok(users.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_only_active_grants_are_recipients() {
        let store = PermissionStore::new();
        store.grant(1, 42);
        store.grant(2, 42);
        store.grant(3, 42);
        store.grant(1, 7);
        store.revoke(2, 42);

        assert_eq!(store.active_users_for(42).await.unwrap(), vec![1, 3]);
        assert_eq!(store.active_users_for(7).await.unwrap(), vec![1]);
        assert!(store.active_users_for(99).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_regrant_reactivates() {
        let store = PermissionStore::new();
        store.grant(5, 1);
        store.revoke(5, 1);
        store.grant(5, 1);

        assert_eq!(store.grants_for(1).len(), 1);
        assert_eq!(store.active_users_for(1).await.unwrap(), vec![5]);
        assert!(!store.revoke(6, 1));
    }
}
