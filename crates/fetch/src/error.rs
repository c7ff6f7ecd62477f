//! Fetch Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A fetch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for fetch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request never produced a response (DNS, TLS, connection reset...).
    #[display("transport failure: {_0}")]
    Transport(#[error(not(source))] String),
    /// The server answered with an HTTP status of 400 or above.
    #[display("HTTP {status} for {url}")]
    Status {
        /// Response status code.
        status: u16,
        /// The URL that was requested.
        url: String,
    },
    /// The response started but the body could not be read to the end.
    #[display("incomplete response body: {_0}")]
    Body(#[error(not(source))] String),
    /// The HTTP client itself could not be constructed.
    #[display("HTTP client error")]
    Client,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Body(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Client => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        let err = ErrorKind::Status {
            status: 404,
            url: "https://x/a/app.js".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404 for https://x/a/app.js");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Transport("reset".to_string()).is_retryable());
        assert!(ErrorKind::Status { status: 503, url: String::new() }.is_retryable());
        assert!(!ErrorKind::Status { status: 404, url: String::new() }.is_retryable());
        assert!(!ErrorKind::Client.is_retryable());
    }
}
