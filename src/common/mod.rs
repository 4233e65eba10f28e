//! Common utilities and types shared across the application.

pub mod error;
pub mod messages;
pub mod report;

pub use error::{ConfigError, ServiceError, ServiceResult};
pub use messages::{ChatEvent, InboundMessage, Origin, RichContent, RichField, RosterEntry};
pub use report::{ErrorReporter, LogReporter};
