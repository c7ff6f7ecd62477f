//! File metadata returned by storage backends.

use std::path::PathBuf;
use time::OffsetDateTime;

/// File metadata returned by storage backends.
///
/// Used for listing operations and for the "is it already mirrored?" checks
/// performed before any network access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Relative path from storage root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: OffsetDateTime,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: OffsetDateTime) -> Self {
        Self {
            path: path.into(),
            size,
            modified,
        }
    }
}
