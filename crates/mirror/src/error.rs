//! Mirror Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A mirror error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for mirror operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A storage backend operation failed.
    #[display("storage operation failed")]
    Storage,
    /// A remote resource could not be fetched.
    #[display("remote fetch failed")]
    Fetch,
    /// A manifest entry cannot be mapped into the mirror (escapes the root,
    /// or cannot be resolved against the origin).
    #[display("invalid manifest entry: {_0}")]
    InvalidAsset(#[error(not(source))] String),
    /// The manifest itself is unusable.
    #[display("invalid manifest: {_0}")]
    InvalidManifest(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage | Self::Fetch)
    }
}
