//! Error types for the butler client.

use butler_core::{QueueId, TransportError};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when using the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] TransportError),

    /// Server returned a non-2xx status.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message or body excerpt from the server.
        message: String,
    },

    /// Failed to deserialize a response body.
    #[error("Failed to deserialize response: {0}")]
    Deserialize(#[from] serde_json::Error),

    /// Invalid base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A handle lacks the numeric trailing segment an identifier is parsed from.
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    /// Response is missing a required header or violates the protocol.
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    /// More than one running build claims the same queue entry.
    #[error("{queue_id} matches more than one running build: {}", .builds.join(", "))]
    AmbiguousCorrelation {
        /// The queue entry being resolved.
        queue_id: QueueId,
        /// URLs of every matching build.
        builds: Vec<String>,
    },

    /// A polling policy ran out of attempts or time.
    #[error("Gave up after {attempts} attempts ({elapsed:?})")]
    Timeout {
        /// Attempts made.
        attempts: u32,
        /// Time spent polling.
        elapsed: Duration,
    },

    /// The operation's cancellation token fired.
    #[error("Operation cancelled")]
    Cancelled,

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// The HTTP status, if the server answered with an error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server answered 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether the server rejected the credentials.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Whether the account lacks permission.
    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_helpers() {
        let err = ClientError::Api {
            status: 404,
            message: "Not Found".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_unauthorized());
        assert_eq!(err.status(), Some(404));
        assert_eq!(ClientError::Cancelled.status(), None);
    }

    #[test]
    fn ambiguous_correlation_lists_builds() {
        let err = ClientError::AmbiguousCorrelation {
            queue_id: QueueId::new(7),
            builds: vec!["http://h/job/a/1/".to_string(), "http://h/job/b/2/".to_string()],
        };
        let display = err.to_string();
        assert!(display.contains("queue#7"));
        assert!(display.contains("http://h/job/a/1/, http://h/job/b/2/"));
    }

    #[test]
    fn timeout_display() {
        let err = ClientError::Timeout {
            attempts: 3,
            elapsed: Duration::from_secs(2),
        };
        assert_eq!(err.to_string(), "Gave up after 3 attempts (2s)");
    }
}
