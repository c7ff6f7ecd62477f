use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use haven_storage::{BackendHandle, validate_path};
use std::path::{Path, PathBuf};
use url::Url;

/// Version marker file, at the storage root.
pub const VERSION_MARKER: &str = "VERSION";
/// Subtree holding one file per manifest entry.
pub const MIRROR_DIR: &str = "mirror";
/// Subtree holding the rewritten entry document.
pub const REWRITTEN_DIR: &str = "rewritten";
/// File name of the rewritten entry document inside [`REWRITTEN_DIR`].
pub const REWRITTEN_ENTRY: &str = "index.html";

/// Where everything lives inside a storage backend.
///
/// Cheap to clone; it only holds the backend handle.
#[derive(Clone)]
pub struct Layout {
    storage: BackendHandle,
}
impl Layout {
    pub fn new(storage: BackendHandle) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &BackendHandle {
        &self.storage
    }

    pub fn marker_path(&self) -> &'static Path {
        Path::new(VERSION_MARKER)
    }

    pub fn mirror_dir(&self) -> &'static Path {
        Path::new(MIRROR_DIR)
    }

    pub fn rewritten_dir(&self) -> &'static Path {
        Path::new(REWRITTEN_DIR)
    }

    /// Storage path of the rewritten entry document.
    pub fn rewritten_path(&self) -> PathBuf {
        Path::new(REWRITTEN_DIR).join(REWRITTEN_ENTRY)
    }

    /// Storage path inside the mirror for a root-relative asset path.
    ///
    /// The asset path is validated on its own first, so `/../VERSION` can't
    /// climb out of the mirror and clobber the marker.
    pub fn mirror_path(&self, asset: &str) -> Result<PathBuf> {
        let relative = validate_path(asset).or_raise(|| ErrorKind::InvalidAsset(asset.to_string()))?;
        Ok(Path::new(MIRROR_DIR).join(relative))
    }

    /// `file://` identity of a storage path.
    pub fn locate(&self, path: &Path) -> Result<Url> {
        self.storage.locate(path).or_raise(|| ErrorKind::Storage)
    }

    /// Directory URL (trailing slash) of the mirror subtree, suitable as a
    /// base for [`Url::join`].
    pub fn mirror_root_url(&self) -> Result<Url> {
        Ok(as_directory(self.locate(self.mirror_dir())?))
    }

    /// Directory URL (trailing slash) of the rewritten subtree.
    pub fn rewritten_root_url(&self) -> Result<Url> {
        Ok(as_directory(self.locate(self.rewritten_dir())?))
    }
}

fn as_directory(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
