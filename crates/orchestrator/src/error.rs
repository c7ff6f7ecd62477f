//! Orchestrator Error Types
//!
//! None of these are fatal to the process. A failed cycle leaves the
//! previous offline entry point in place; a failed context creation is
//! retried on the next connectivity change.

use derive_more::{Display, Error};

/// An orchestrator error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for orchestrator operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The manifest source couldn't supply a manifest.
    Manifest,
    /// Producing the rewritten entry document failed.
    Rewrite,
    /// The in-page scripts couldn't be rendered.
    Script,
    /// The host refused to create an execution context.
    #[display("host error: {_0}")]
    Host(#[error(not(source))] String),
    /// Misconfiguration detected while assembling the components.
    #[display("invalid settings: {_0}")]
    Settings(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Manifest | Self::Rewrite | Self::Host(_))
    }
}
