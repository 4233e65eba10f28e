//! Error types for the application.

use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Errors raised by the external chat service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Failed to connect to Discord: {message}")]
    ConnectionFailed { message: String },

    #[error("Channel not found or not accessible: {channel_id}")]
    ChannelNotFound { channel_id: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Not connected to Discord")]
    NotConnected,

    #[error("Discord request failed: {message}")]
    Request { message: String },
}

impl ServiceError {
    /// Whether the failure means the destination channel cannot be used,
    /// either because it is missing or because the bot may not access it.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Self::ChannelNotFound { .. } | Self::PermissionDenied { .. }
        )
    }

    /// Whether a connection attempt that failed this way is worth retrying.
    ///
    /// A rejected token will be rejected again, everything else may be transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::PermissionDenied { .. })
    }
}

/// Result type alias for chat service operations.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
