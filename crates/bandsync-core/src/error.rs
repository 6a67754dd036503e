//! Error types for bandsync-core.
//!
//! All protocol failures are terminal for the task they belong to, never for
//! the executor: the queue always advances past a failed exchange. The
//! variants here surface on the executor API and through task failure
//! events.

use std::time::Duration;

use thiserror::Error;

use bandsync_types::ParseError;

/// Errors that can occur while driving the band's sync protocol.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The underlying channel failed to write an outbound frame.
    #[error("channel write failed: {0}")]
    Channel(String),

    /// An exchange timed out.
    #[error("operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// Failed to parse data received from the band.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Invalid configuration provided.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The executor has been closed and no longer accepts work.
    #[error("task executor closed")]
    Closed,
}

impl Error {
    /// Create a channel error from any displayable reason.
    pub fn channel(reason: impl Into<String>) -> Self {
        Self::Channel(reason.into())
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// Result type alias using bandsync-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::channel("link closed");
        assert_eq!(err.to_string(), "channel write failed: link closed");

        let err = Error::timeout("sleep_index_sync", Duration::from_secs(3));
        assert!(err.to_string().contains("sleep_index_sync"));
        assert!(err.to_string().contains("3s"));

        assert_eq!(Error::Closed.to_string(), "task executor closed");
    }

    #[test]
    fn test_parse_error_conversion() {
        let parse = ParseError::InsufficientBytes {
            expected: 10,
            actual: 3,
        };
        let err: Error = parse.into();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().contains("10"));
    }
}
