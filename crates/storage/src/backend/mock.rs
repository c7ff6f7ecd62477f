//! In-memory storage backend for testing.

use super::FileInfoStream;
use crate::StorageBackend;
use crate::error::{Error, ErrorKind, Result};
use crate::file::FileInfo;
use crate::path::validate as validate_path;
use async_trait::async_trait;
use futures::TryStreamExt;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use url::Url;

struct Stored {
    modified: OffsetDateTime,
    data: Vec<u8>,
}
impl Stored {
    fn now(data: impl Into<Vec<u8>>) -> Self {
        Self {
            modified: OffsetDateTime::now_utc(),
            data: data.into(),
        }
    }

    fn info(&self, path: &Path) -> FileInfo {
        FileInfo::new(path, self.data.len() as u64, self.modified)
    }
}

/// In-memory storage backend for testing.
///
/// Files live in an ordered map keyed by validated path. Directories are
/// implicit: one exists exactly when a file exists beneath it, so
/// `create_dir_all` only validates.
///
/// # Examples
///
/// ```
/// use haven_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("mirror/app/index.html", b"<html>...</html>"),
/// ]);
/// assert!(backend.exists(Path::new("mirror/app/index.html")).await?);
///
/// backend.write(Path::new("VERSION"), b"v1").await?;
/// assert!(backend.exists(Path::new("VERSION")).await?);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    files: RwLock<BTreeMap<PathBuf, Stored>>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics on a path that fails validation; broken test setup should not
    /// pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let files = files
            .into_iter()
            .map(|(path, data)| {
                let path = path.into();
                let Ok(validated) = validate_path(&path) else {
                    panic!("MockBackend::with_files: invalid path {}", path.display());
                };
                (validated, Stored::now(data))
            })
            .collect();
        Self {
            name: "mock".to_string(),
            files: RwLock::new(files),
        }
    }

    /// Change the name of the mock backend.
    ///
    /// The name doubles as the first path segment of [`locate()`](StorageBackend::locate)
    /// URLs, e.g. `file:///mock/mirror/app.js`.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Every stored path, sorted.
    pub async fn paths(&self) -> Vec<PathBuf> {
        self.files.read().await.keys().cloned().collect()
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

fn not_found(path: PathBuf) -> Error {
    exn::Exn::from(ErrorKind::NotFound(path))
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        Box::pin(futures::stream::once(async move {
            let prefix = prefix.map(validate_path).transpose()?;
            let files = self.files.read().await;
            let listed: Vec<_> = files
                .iter()
                .filter(|(path, _)| prefix.as_ref().is_none_or(|p| path.starts_with(p)))
                .map(|(path, stored)| Ok(stored.info(path)))
                .collect();
            Ok::<_, Error>(futures::stream::iter(listed))
        }).try_flatten())
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.files.read().await.contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        match self.files.read().await.get(&path) {
            Some(stored) => Ok(stored.data.clone()),
            None => Err(not_found(path)),
        }
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        self.files.write().await.insert(path, Stored::now(data));
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        match self.files.write().await.remove(&path) {
            Some(_) => Ok(()),
            None => Err(not_found(path)),
        }
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let (from, to) = (validate_path(from)?, validate_path(to)?);
        let mut files = self.files.write().await;
        let stored = files.remove(&from).ok_or_else(|| not_found(from))?;
        files.insert(to, stored);
        Ok(())
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let path = validate_path(path)?;
        match self.files.read().await.get(&path) {
            Some(stored) => Ok(stored.info(&path)),
            None => Err(not_found(path)),
        }
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        validate_path(path)?;
        Ok(())
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        let mut files = self.files.write().await;
        let before = files.len();
        files.retain(|stored, _| !stored.starts_with(&path));
        if files.len() == before {
            return Err(not_found(path));
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.files.write().await.clear();
        Ok(())
    }

    fn locate(&self, path: &Path) -> Result<Url> {
        let path = validate_path(path)?;
        Url::parse(&format!("file:///{}/{}", self.name, path.display()))
            .map_err(|e| exn::Exn::from(ErrorKind::BackendError(e.to_string())))
    }
}
