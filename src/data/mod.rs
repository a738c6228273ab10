pub mod alert;
pub mod duration;
pub mod event;
pub mod notification;

pub type AlertId = u64;
pub type ApplicationId = u64;
pub type NotificationId = u64;
pub type UserId = u64;

pub use alert::{AlertDefinition, AlertSpec, Application, SeverityLevel, UnknownSeverity, MAX_THRESHOLD};
pub use duration::{format_iso8601, parse_iso8601, DurationParseError};
pub use event::LogEvent;
pub use notification::{
    GrantStatus, NewNotification, NotificationRecord, Page, PageRequest, PermissionGrant,
};
