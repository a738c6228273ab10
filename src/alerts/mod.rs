//! Alert detection and notification engine
//!
//! A background detector counts matching log events per alert window,
//! tracks which alerts are in breach, and fans out one notification round
//! per breach episode to every user permitted on the application.

pub mod detector;
pub mod fanout;
pub mod source;
pub mod tracker;
pub mod window;

pub use detector::{AlertDetector, EvaluationError, Evaluation, TickReport, DEFAULT_DETECTION_INTERVAL};
pub use fanout::{FanoutError, NotificationFanout};
pub use source::{AlertSource, EventCounter, NotificationSink, PermissionSource};
pub use tracker::{FiringTracker, LocalFiringTracker, Transition};
pub use window::{WindowCounter, WindowError};
