//! Intercept Error Types

use derive_more::{Display, Error};

/// An intercept error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for intercept operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// An in-page script could not be produced.
    #[display("unable to render {_0} script")]
    Script(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
