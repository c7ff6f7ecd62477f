//! Rewrite Error Types
//!
//! Only a missing entry document is fatal to a rewrite cycle. Everything that
//! goes wrong with an individual reference degrades to leaving it untouched,
//! so it never shows up here.

use derive_more::{Display, Error};

/// A rewrite error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for rewrite operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The mirrored entry document isn't in the mirror; the previous rewritten
    /// document (if any) stays authoritative.
    #[display("entry document not mirrored: {_0}")]
    EntryMissing(#[error(not(source))] String),
    /// Reading the mirror or writing the rewritten document failed.
    Storage,
    /// The rewrite policy was configured with something unusable.
    #[display("invalid rewrite policy: {_0}")]
    InvalidPolicy(#[error(not(source))] String),
    /// An embedded script is missing or its template failed to render.
    #[display("unable to render script: {_0}")]
    Script(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage | Self::EntryMissing(_))
    }
}
