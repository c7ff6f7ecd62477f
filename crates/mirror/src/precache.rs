//! Filling the mirror from a manifest.
//!
//! Entries are processed strictly one at a time: one existence check, at most
//! one fetch, at most one write, then the next entry. A failure is attributed
//! to exactly one asset and never aborts the pass.

use crate::error::{ErrorKind, Result};
use crate::{Layout, LocalAsset, Manifest, UrlMap};
use exn::ResultExt;
use haven_fetch::FetcherHandle;
use std::path::{Path, PathBuf};
use tracing::instrument;
use url::Url;

/// A manifest entry that could not be mirrored during this pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecacheFailure {
    pub asset: String,
    pub reason: String,
}

/// Outcome of one precache pass.
#[derive(Debug, Clone, Default)]
pub struct PrecacheReport {
    /// Lookup table for the rewriter. Contains keys for failed downloads too,
    /// pointing at the still-absent destination.
    pub url_map: UrlMap,
    /// Entries fetched from the network during this pass.
    pub downloaded: usize,
    /// Entries already present in the mirror (no network access).
    pub cached: usize,
    pub failed: Vec<PrecacheFailure>,
}
impl PrecacheReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

enum Outcome {
    Cached,
    Downloaded(usize),
}

/// Ensures every manifest entry exists in the mirror.
#[derive(Clone)]
pub struct Precache {
    layout: Layout,
    fetcher: FetcherHandle,
}
impl Precache {
    pub fn new(layout: Layout, fetcher: FetcherHandle) -> Self {
        Self { layout, fetcher }
    }

    /// Mirror every asset of `manifest`, returning the lookup table and
    /// per-asset statistics.
    ///
    /// An existing destination file is a cache hit and is trusted as-is; the
    /// [`VersionGate`](crate::VersionGate) has already thrown away anything
    /// from a previous version.
    #[instrument(skip_all, fields(version = %manifest.version, assets = manifest.assets.len()))]
    pub async fn run(&self, manifest: &Manifest) -> PrecacheReport {
        let mut report = PrecacheReport::default();
        for asset in &manifest.assets {
            let (remote, local) = match self.destination(manifest, asset) {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(asset = %asset, error = ?e, "Skipping manifest entry that can't be mirrored");
                    report.failed.push(PrecacheFailure {
                        asset: asset.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                },
            };
            match self.ensure(&remote, &local.path).await {
                Ok(Outcome::Cached) => {
                    tracing::trace!(asset = %asset, "Cache hit");
                    report.cached += 1;
                },
                Ok(Outcome::Downloaded(bytes)) => {
                    tracing::debug!(asset = %asset, bytes, "Downloaded");
                    report.downloaded += 1;
                },
                Err(e) => {
                    // Still emit the mapping: a later reference to this asset
                    // should fail loudly against the missing file rather than
                    // silently fall back to the network.
                    tracing::warn!(asset = %asset, url = %remote, error = ?e, "Failed to mirror asset");
                    report.failed.push(PrecacheFailure {
                        asset: asset.clone(),
                        reason: e.to_string(),
                    });
                },
            }
            report.url_map.insert(&remote, local);
        }
        tracing::info!(
            downloaded = report.downloaded,
            cached = report.cached,
            failed = report.failed.len(),
            "Precache pass complete"
        );
        report
    }

    fn destination(&self, manifest: &Manifest, asset: &str) -> Result<(Url, LocalAsset)> {
        let remote = manifest.remote_url(asset)?;
        let path: PathBuf = self.layout.mirror_path(asset)?;
        let url = self.layout.locate(&path)?;
        Ok((remote, LocalAsset { path, url }))
    }

    async fn ensure(&self, remote: &Url, path: &Path) -> Result<Outcome> {
        let storage = self.layout.storage();
        if storage.exists(path).await.or_raise(|| ErrorKind::Storage)? {
            return Ok(Outcome::Cached);
        }
        let body = self.fetcher.fetch(remote).await.or_raise(|| ErrorKind::Fetch)?;
        // The backend creates parent directories and only exposes the file
        // once it's completely written.
        storage.write(path, &body).await.or_raise(|| ErrorKind::Storage)?;
        Ok(Outcome::Downloaded(body.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_fetch::MockFetcher;
    use haven_storage::backend::MockBackend;
    use haven_storage::{BackendHandle, StorageBackend};
    use std::sync::Arc;

    fn manifest(assets: &[&str]) -> Manifest {
        Manifest::new("v1", Url::parse("https://x").unwrap(), "/a/index.html", assets.iter().copied())
    }

    fn setup(storage: MockBackend, fetcher: MockFetcher) -> (Arc<MockBackend>, Arc<MockFetcher>, Precache) {
        let storage = Arc::new(storage.with_name("device"));
        let fetcher = Arc::new(fetcher);
        let handle: BackendHandle = storage.clone();
        (storage.clone(), fetcher.clone(), Precache::new(Layout::new(handle), fetcher))
    }

    #[tokio::test]
    async fn test_fresh_run_downloads_everything() {
        let (storage, fetcher, precache) = setup(
            MockBackend::default(),
            MockFetcher::with_responses([("https://x/a/index.html", "<html></html>"), ("https://x/a/app.js", "go()")]),
        );
        let report = precache.run(&manifest(&["/a/index.html", "/a/app.js"])).await;
        assert_eq!(report.downloaded, 2);
        assert_eq!(report.cached, 0);
        assert!(report.is_complete());
        assert_eq!(fetcher.request_count().await, 2);
        assert_eq!(storage.read(Path::new("mirror/a/app.js")).await.unwrap(), b"go()");

        let map = &report.url_map;
        assert_eq!(map.len(), 4);
        let m2 = map.get("https://x/a/app.js").unwrap();
        assert_eq!(map.get("/a/app.js"), Some(m2));
        assert_eq!(m2.url.as_str(), "file:///device/mirror/a/app.js");
        assert_eq!(map.get("https://x/a/index.html"), map.get("/a/index.html"));
    }

    #[tokio::test]
    async fn test_cached_entries_never_touch_the_network() {
        let (_storage, fetcher, precache) = setup(
            MockBackend::with_files([("mirror/a/index.html", "<html></html>"), ("mirror/a/app.js", "go()")]),
            MockFetcher::default(),
        );
        let report = precache.run(&manifest(&["/a/index.html", "/a/app.js"])).await;
        assert_eq!(report.downloaded, 0);
        assert_eq!(report.cached, 2);
        assert_eq!(fetcher.request_count().await, 0);
        assert_eq!(report.url_map.len(), 4);
    }

    #[tokio::test]
    async fn test_failed_download_is_recorded_and_still_mapped() {
        let (storage, fetcher, precache) =
            setup(MockBackend::default(), MockFetcher::with_responses([("https://x/a/app.js", "go()")]));
        let report = precache.run(&manifest(&["/a/missing.css", "/a/app.js"])).await;
        assert_eq!(report.downloaded, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].asset, "/a/missing.css");
        // Failure didn't stop the pass
        assert_eq!(fetcher.request_count().await, 2);
        // Mapping points at the absent destination
        let missing = report.url_map.get("/a/missing.css").unwrap();
        assert_eq!(missing.path, Path::new("mirror/a/missing.css"));
        assert!(!storage.exists(&missing.path).await.unwrap());
    }

    #[tokio::test]
    async fn test_traversal_entry_is_rejected_without_keys() {
        let (storage, fetcher, precache) = setup(MockBackend::default(), MockFetcher::default());
        let report = precache.run(&manifest(&["/../VERSION"])).await;
        assert_eq!(report.failed.len(), 1);
        assert!(report.url_map.is_empty());
        assert_eq!(fetcher.request_count().await, 0);
        assert!(storage.paths().await.is_empty());
    }

    #[tokio::test]
    async fn test_off_origin_entry_is_rejected_without_keys() {
        let (storage, fetcher, precache) = setup(
            MockBackend::default(),
            MockFetcher::with_responses([("https://cdn.example/lib.js", "lib()"), ("https://x/lib.js", "own()")]),
        );
        let report = precache.run(&manifest(&["//cdn.example/lib.js", "/lib.js"])).await;
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].asset, "//cdn.example/lib.js");
        assert_eq!(fetcher.requests().await, vec![Url::parse("https://x/lib.js").unwrap()]);
        assert_eq!(report.url_map.get("/lib.js").unwrap().path, Path::new("mirror/lib.js"));
        assert!(report.url_map.get("https://cdn.example/lib.js").is_none());
        assert_eq!(storage.read(Path::new("mirror/lib.js")).await.unwrap(), b"own()");
    }

    #[tokio::test]
    async fn test_entries_fetched_in_manifest_order() {
        let (_storage, fetcher, precache) = setup(
            MockBackend::default(),
            MockFetcher::with_responses([("https://x/b.js", "b"), ("https://x/a.js", "a"), ("https://x/c.js", "c")]),
        );
        precache.run(&manifest(&["/c.js", "/a.js", "/b.js"])).await;
        let order: Vec<_> = fetcher.requests().await.iter().map(|u| u.path().to_string()).collect();
        assert_eq!(order, vec!["/c.js", "/a.js", "/b.js"]);
    }
}
