//! logalert: Alert Detection & Notification Engine
//!
//! Periodically evaluates threshold rules ("at least N events of level L
//! within window W for application A") against a log event store and
//! notifies every user permitted on the application, once per breach
//! episode.
//!
//! # Features
//!
//! - **Windowed counting**: events strictly newer than `now - window`
//! - **Edge-triggered alerts**: one notification round per breach episode
//! - **Failure isolation**: one broken alert never stops the others
//! - **Retry on next tick**: a failed fanout leaves the alert idle
//! - **Recipient inbox**: paginated, recipient-scoped, idempotent mark-as-read
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use logalert::api::{build_detector, AppState, PagingConfig};
//! use logalert::data::{AlertSpec, LogEvent, SeverityLevel};
//!
//! # async fn demo() {
//! let state = Arc::new(AppState::new(PagingConfig::default()));
//! let app = state.applications.create("checkout");
//! state.permissions.grant(7, app.id);
//! state
//!     .alerts
//!     .create(AlertSpec::new(app.id, SeverityLevel::Error, 5, Duration::from_secs(300)), 1)
//!     .unwrap();
//!
//! for _ in 0..5 {
//!     state.events.append(LogEvent::new(app.id, "ERROR", chrono::Utc::now()));
//! }
//!
//! let detector = build_detector(&state, Duration::from_secs(60));
//! let report = detector.run_tick(chrono::Utc::now()).await;
//! println!("Triggered: {}", report.triggered);
//! # }
//! ```

pub mod alerts;
pub mod api;
pub mod data;
pub mod storage;

// Re-export commonly used types
pub use alerts::{AlertDetector, TickReport};
pub use data::{AlertDefinition, AlertSpec, LogEvent, NotificationRecord, SeverityLevel};
pub use storage::StoreError;
