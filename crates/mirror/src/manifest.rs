use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use haven_fetch::FetcherHandle;
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use url::Url;

pub type ManifestHandle = Arc<dyn ManifestSource + Send + Sync>;

/// What must be mirrored, and under which version.
///
/// `assets` is ordered and processed in that order. Duplicates are harmless
/// (the second occurrence is a cache hit). The entry document is named
/// separately because it is the one asset the rewriter reads; it is expected
/// to appear in `assets` as well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub version: String,
    pub origin: Url,
    pub entry: String,
    pub assets: Vec<String>,
}
impl Manifest {
    pub fn new(
        version: impl Into<String>,
        origin: Url,
        entry: impl Into<String>,
        assets: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            version: version.into(),
            origin,
            entry: root_relative(entry.into()),
            assets: assets.into_iter().map(|a| root_relative(a.into())).collect(),
        }
    }

    /// Fully-qualified remote URL of an asset: `origin + path`.
    ///
    /// An entry that resolves anywhere else (`//cdn.example/lib.js` is
    /// protocol-relative, not a path) is invalid.
    pub fn remote_url(&self, asset: &str) -> Result<Url> {
        let url = self.origin.join(asset).or_raise(|| ErrorKind::InvalidAsset(asset.to_string()))?;
        if url.origin() != self.origin.origin() {
            exn::bail!(ErrorKind::InvalidAsset(asset.to_string()));
        }
        Ok(url)
    }

    /// Fully-qualified remote URL of the entry document.
    pub fn entry_url(&self) -> Result<Url> {
        self.remote_url(&self.entry)
    }
}

/// Manifest paths are root-relative; tolerate entries written without the
/// leading slash.
fn root_relative(path: String) -> String {
    match path.starts_with('/') {
        true => path,
        false => format!("/{path}"),
    }
}

/// Supplies the current [`Manifest`]. Consulted at process start and on each
/// transition to online.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    async fn load(&self) -> Result<Manifest>;
}

/// A manifest known up front (typically from configuration).
pub struct StaticManifest(Manifest);
impl StaticManifest {
    pub fn new(manifest: Manifest) -> Self {
        Self(manifest)
    }
}

#[async_trait]
impl ManifestSource for StaticManifest {
    async fn load(&self) -> Result<Manifest> {
        Ok(self.0.clone())
    }
}

/// A manifest published as JSON next to the application:
///
/// ```json
/// { "version": "2024.06.1", "assets": ["/app/index.html", "/app/main.js"] }
/// ```
pub struct RemoteManifest {
    fetcher: FetcherHandle,
    url: Url,
    origin: Url,
    entry: String,
}
impl RemoteManifest {
    pub fn new(fetcher: FetcherHandle, url: Url, origin: Url, entry: impl Into<String>) -> Self {
        Self {
            fetcher,
            url,
            origin,
            entry: entry.into(),
        }
    }
}

#[derive(Deserialize)]
struct ManifestDocument {
    version: String,
    assets: Vec<String>,
}

#[async_trait]
impl ManifestSource for RemoteManifest {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn load(&self) -> Result<Manifest> {
        let body = self.fetcher.fetch(&self.url).await.or_raise(|| ErrorKind::Fetch)?;
        let document: ManifestDocument = serde_json::from_slice(&body)
            .map_err(|e| ErrorKind::InvalidManifest(format!("{}: {e}", self.url)))?;
        if document.version.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidManifest(format!("{}: empty version", self.url)));
        }
        tracing::debug!(version = %document.version, assets = document.assets.len(), "Loaded remote manifest");
        Ok(Manifest::new(document.version.trim(), self.origin.clone(), self.entry.clone(), document.assets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_fetch::MockFetcher;
    use rstest::rstest;

    fn origin() -> Url {
        Url::parse("https://x").unwrap()
    }

    #[rstest]
    #[case("/a/app.js", "https://x/a/app.js")]
    #[case("a/app.js", "https://x/a/app.js")]
    #[case("/a/my file.js", "https://x/a/my%20file.js")]
    fn test_remote_url(#[case] asset: &str, #[case] expected: &str) {
        let manifest = Manifest::new("v1", origin(), "/a/index.html", [asset]);
        assert_eq!(manifest.remote_url(&manifest.assets[0]).unwrap().as_str(), expected);
    }

    #[rstest]
    #[case("//cdn.example/lib.js")]
    #[case("https://cdn.example/lib.js")]
    #[case("http://x/a/app.js")]
    fn test_remote_url_stays_on_origin(#[case] asset: &str) {
        let manifest = Manifest::new("v1", origin(), "/a/index.html", [asset]);
        let err = manifest.remote_url(&manifest.assets[0]).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidAsset(_)));
    }

    #[test]
    fn test_origin_path_is_not_a_prefix() {
        // Entries are root-relative, so an origin with a path doesn't nest them.
        let manifest = Manifest::new("v1", Url::parse("https://x/app/").unwrap(), "/a/index.html", ["/a/app.js"]);
        assert_eq!(manifest.entry_url().unwrap().as_str(), "https://x/a/index.html");
    }

    #[tokio::test]
    async fn test_remote_manifest() {
        let fetcher = MockFetcher::with_responses([(
            "https://x/manifest.json",
            r#"{"version": "v2", "assets": ["/a/index.html", "a/app.js"]}"#,
        )]);
        let source =
            RemoteManifest::new(Arc::new(fetcher), Url::parse("https://x/manifest.json").unwrap(), origin(), "/a/index.html");
        let manifest = source.load().await.unwrap();
        assert_eq!(manifest.version, "v2");
        assert_eq!(manifest.assets, vec!["/a/index.html".to_string(), "/a/app.js".to_string()]);
    }

    #[tokio::test]
    async fn test_remote_manifest_rejects_garbage() {
        let fetcher = MockFetcher::with_responses([("https://x/manifest.json", "<html>oops</html>")]);
        let source =
            RemoteManifest::new(Arc::new(fetcher), Url::parse("https://x/manifest.json").unwrap(), origin(), "/a/index.html");
        let err = source.load().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidManifest(_)));
    }

    #[tokio::test]
    async fn test_remote_manifest_unreachable() {
        let source = RemoteManifest::new(
            Arc::new(MockFetcher::default()),
            Url::parse("https://x/manifest.json").unwrap(),
            origin(),
            "/a/index.html",
        );
        let err = source.load().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Fetch));
    }
}
