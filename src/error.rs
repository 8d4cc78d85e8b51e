//! Error types for threadvault.

use std::io;
use thiserror::Error;

/// Result type alias for threadvault operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in threadvault operations.
///
/// Expected negative outcomes (a thread that does not exist, a delete of an
/// unknown id) are never errors; they are part of the return types.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage I/O error.
    #[error("Storage error: {0}")]
    Storage(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Front matter serialization/deserialization error.
    #[error("Front matter error: {0}")]
    FrontMatter(#[from] serde_yaml::Error),

    /// HTTP transport error talking to a remote store or summarizer.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote endpoint answered with a non-success status.
    #[error("Remote returned status {status}: {body}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// A stored document could not be parsed.
    #[error("Malformed document: {0}")]
    Format(String),

    /// Caller supplied input that fails a precondition.
    #[error("{0}")]
    Validation(String),

    /// Invalid state encountered.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error is a caller precondition failure rather than a
    /// fatal I/O or protocol failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_is_bare() {
        let err = Error::Validation("Either id or title must be provided".to_string());
        assert_eq!(err.to_string(), "Either id or title must be provided");
        assert!(err.is_validation());
    }

    #[test]
    fn io_errors_are_not_validation() {
        let err: Error = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert!(!err.is_validation());
        assert!(err.to_string().starts_with("Storage error"));
    }

    #[test]
    fn remote_error_shows_status() {
        let err = Error::Remote {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Remote returned status 500: boom");
    }
}
