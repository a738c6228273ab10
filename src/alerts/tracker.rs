//! Per-alert breach bookkeeping
//!
//! An alert is Firing while its id is present in the tracker and Idle
//! otherwise. Presence means the current breach episode has already been
//! notified, which is what keeps a sustained breach from re-notifying on
//! every tick.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::data::AlertId;
use crate::storage::StoreError;

/// Outcome of comparing a fresh count against the tracked state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Idle -> Firing: notify, then record
    Triggered,
    /// Firing -> Firing: breach persists, already notified
    StillFiring,
    /// Firing -> Idle: count dropped below threshold
    Resolved,
    /// Idle -> Idle
    Quiet,
}

impl Transition {
    pub fn decide(count: u64, threshold: u32, firing: bool) -> Self {
        let breached = count >= u64::from(threshold);
        match (breached, firing) {
            (true, false) => Transition::Triggered,
            (true, true) => Transition::StillFiring,
            (false, true) => Transition::Resolved,
            (false, false) => Transition::Quiet,
        }
    }
}

/// Storage for firing state
///
/// The local implementation is process-private; a deployment running more
/// than one detector must swap in a shared implementation.
#[async_trait]
pub trait FiringTracker: Send + Sync {
    /// Start of the current breach episode, if the alert is firing
    async fn firing_since(&self, id: AlertId) -> Result<Option<DateTime<Utc>>, StoreError>;

    async fn mark_firing(&self, id: AlertId, since: DateTime<Utc>) -> Result<(), StoreError>;

    /// Returns the episode start when the alert was firing
    async fn clear(&self, id: AlertId) -> Result<Option<DateTime<Utc>>, StoreError>;

    async fn is_firing(&self, id: AlertId) -> Result<bool, StoreError> {
        Ok(self.firing_since(id).await?.is_some())
    }
}

/// In-process tracker; empty at startup and forgotten on restart.
/// The detector clears entries of alerts it skips as disabled.
#[derive(Debug, Default)]
pub struct LocalFiringTracker {
    firing: DashMap<AlertId, DateTime<Utc>>,
}

impl LocalFiringTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FiringTracker for LocalFiringTracker {
    async fn firing_since(&self, id: AlertId) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.firing.get(&id).map(|since| *since))
    }

    async fn mark_firing(&self, id: AlertId, since: DateTime<Utc>) -> Result<(), StoreError> {
        self.firing.insert(id, since);
        Ok(())
    }

    async fn clear(&self, id: AlertId) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.firing.remove(&id).map(|(_, since)| since))
    }
}
