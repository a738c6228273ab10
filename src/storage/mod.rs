//! In-memory stores backing the engine's collaborators

pub mod alerts;
pub mod applications;
pub mod events;
pub mod notifications;
pub mod permissions;

pub use alerts::{AlertError, AlertStore, AlertUpdate};
pub use applications::ApplicationStore;
pub use events::LogStore;
pub use notifications::{NotificationError, NotificationStore};
pub use permissions::PermissionStore;

/// Errors raised by a backing store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
