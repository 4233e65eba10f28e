//! Operator-facing error reporting.

use tracing::error;

/// Sink for problems an operator has to act on (missing channels, permissions).
pub trait ErrorReporter: Send + Sync {
    fn report(&self, message: &str);
}

/// Reports through the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, message: &str) {
        error!("{}", message);
    }
}
