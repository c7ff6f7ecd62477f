//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, the storage provider the
//! mirror engine talks to. Everything the engine persists (the version
//! marker, mirrored assets and the rewritten entry document) goes through it.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::Result;
use crate::file::FileInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;
use url::Url;

pub(crate) type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// Unified interface for storage backends.
///
/// All storage operations are asynchronous; the engine awaits them one at a
/// time so that destination writes happen in a predictable order.
///
/// # Path Handling
/// All paths are relative to the storage root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations should
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use haven_storage::{backend::StorageBackend, error::Result};
///
/// async fn size_of_mirrored_asset(backend: &dyn StorageBackend) -> Result<u64> {
///     let path = PathBuf::from("mirror/app/main.js");
///     if backend.exists(&path).await? {
///         Ok(backend.stat(&path).await?.size)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend. Used for logging only.
    fn name(&self) -> &str;

    /// List all files matching an optional prefix.
    ///
    /// Default implementation of this method is to collect all the results
    /// from [`list_stream()`](Self::list_stream) into a [`Vec`] before
    /// returning.
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Stream file metadata matching an optional prefix.
    ///
    /// If a prefix is provided, only files whose paths start with the prefix
    /// (component-wise) are returned. Listing a prefix that does not exist
    /// yields an empty stream rather than an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// use std::path::Path;
    /// # use haven_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut stream = backend.list_stream(Some(Path::new("mirror")));
    /// while let Some(info) = stream.try_next().await? {
    ///     println!("{}: {} bytes", info.path.display(), info.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a>;

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write file contents.
    ///
    /// Creates a new file or replaces an existing file with the provided data.
    ///
    /// # Notes
    /// - Implementations must create parent directories as needed.
    /// - Implementations must never leave a destination holding less than
    ///   the full data: either the new content is visible at `path`, or
    ///   whatever was there before still is.
    ///
    /// ```no_run
    /// use std::path::Path;
    /// # use haven_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// backend.write(Path::new("VERSION"), b"2024.06.1").await?;
    /// # Ok(())
    /// # }
    /// ```
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Delete a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Rename/move a file within the same backend.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the source
    /// file does not exist. Parent directories of the destination are created
    /// as needed and an existing destination is overwritten.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Get file metadata without reading contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn stat(&self, path: &Path) -> Result<FileInfo>;

    /// Create a directory, including any missing intermediate directories.
    ///
    /// Succeeds if the directory already exists.
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Recursively delete a directory and everything beneath it.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if there is
    /// nothing at `path`. The storage root itself can never be removed, since
    /// an empty path fails validation.
    async fn remove_dir_all(&self, path: &Path) -> Result<()>;

    /// Delete everything under the storage root, scratch files included,
    /// leaving the root itself as an empty directory.
    async fn clear(&self) -> Result<()>;

    /// Local-storage-scheme identity (a `file://` URL) of a path.
    ///
    /// This is what a hosted document loads when it references the file. The
    /// file does not have to exist yet.
    ///
    /// ```no_run
    /// use std::path::Path;
    /// # use haven_storage::{backend::StorageBackend, error::Result};
    /// # fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let url = backend.locate(Path::new("mirror/app/main.js"))?;
    /// assert_eq!(url.scheme(), "file");
    /// # Ok(())
    /// # }
    /// ```
    fn locate(&self, path: &Path) -> Result<Url>;
}
