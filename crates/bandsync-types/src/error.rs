//! Error types for data parsing in bandsync-types.

use thiserror::Error;

/// Errors that can occur when parsing raw band data.
///
/// This error type is platform-agnostic and does not include
/// transport-specific errors (those belong in bandsync-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// Buffer was shorter than the format requires.
    #[error("insufficient bytes: requires {expected} bytes, got {actual}")]
    InsufficientBytes {
        /// Number of bytes the format requires.
        expected: usize,
        /// Number of bytes actually provided.
        actual: usize,
    },

    /// A field decoded to a value outside its valid range.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Result type alias using bandsync-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
