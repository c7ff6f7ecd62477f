use crate::RewritePolicy;
use crate::error::{ErrorKind, Result};
use crate::transform::{
    BaseHref, BootstrapOptions, InjectBootstrap, RewriteContext, RewriteReferences, StripBlocking, Transform,
};
use exn::ResultExt;
use haven_mirror::{Layout, Manifest, UrlMap};
use std::path::PathBuf;
use tracing::instrument;
use url::Url;

/// The offline-runnable entry document as stored on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenDocument {
    /// Storage path, relative to the storage root.
    pub path: PathBuf,
    /// `file://` identity a hosted context loads it by.
    pub url: Url,
    /// BLAKE3 hash of the stored bytes, hex encoded.
    pub digest: String,
}

/// Produces the offline entry document from the mirrored one.
///
/// The transforms run in a fixed order: base reference, compatibility
/// bootstrap, blocking-directive removal, reference rewriting.
pub struct DocumentRewriter {
    layout: Layout,
    policy: RewritePolicy,
    transforms: Vec<Box<dyn Transform>>,
}

impl DocumentRewriter {
    pub fn new(layout: Layout, policy: RewritePolicy, bootstrap: &BootstrapOptions) -> Result<Self> {
        let transforms: Vec<Box<dyn Transform>> = vec![
            Box::new(BaseHref),
            Box::new(InjectBootstrap::new(bootstrap, &policy)?),
            Box::new(StripBlocking),
            Box::new(RewriteReferences),
        ];
        Ok(Self {
            layout,
            policy,
            transforms,
        })
    }

    pub fn policy(&self) -> &RewritePolicy {
        &self.policy
    }

    /// Pure text-to-text rewrite. Applying it to its own output changes
    /// nothing.
    pub fn rewrite(&self, document: &str, document_url: &Url, url_map: &UrlMap) -> String {
        let context = RewriteContext {
            document_url,
            url_map,
            policy: &self.policy,
        };
        self.transforms.iter().fold(document.to_string(), |html, transform| {
            let _span = tracing::trace_span!("transform", name = transform.name()).entered();
            transform.apply(&html, &context)
        })
    }

    /// Rewrite the mirrored entry document of `manifest` and store the
    /// result.
    ///
    /// Fails only when the entry document isn't in the mirror (or storage
    /// itself fails); the previously stored document is then left as it
    /// was. Unchanged output isn't written again.
    #[instrument(skip_all, fields(entry = %manifest.entry))]
    pub async fn rewrite_entry(&self, manifest: &Manifest, url_map: &UrlMap) -> Result<RewrittenDocument> {
        let storage = self.layout.storage();
        let source =
            self.layout.mirror_path(&manifest.entry).or_raise(|| ErrorKind::EntryMissing(manifest.entry.clone()))?;
        if !storage.exists(&source).await.or_raise(|| ErrorKind::Storage)? {
            exn::bail!(ErrorKind::EntryMissing(manifest.entry.clone()));
        }
        let bytes = storage.read(&source).await.or_raise(|| ErrorKind::Storage)?;
        let document_url = manifest.entry_url().or_raise(|| ErrorKind::EntryMissing(manifest.entry.clone()))?;
        let output = self.rewrite(&String::from_utf8_lossy(&bytes), &document_url, url_map);
        let digest = blake3::hash(output.as_bytes());

        let path = self.layout.rewritten_path();
        match storage.read(&path).await {
            Ok(existing) if blake3::hash(&existing) == digest => {
                tracing::debug!(digest = %digest, "Rewritten document unchanged");
            },
            _ => {
                storage.write(&path, output.as_bytes()).await.or_raise(|| ErrorKind::Storage)?;
                tracing::info!(digest = %digest, bytes = output.len(), "Stored rewritten document");
            },
        }
        Ok(RewrittenDocument {
            url: self.layout.locate(&path).or_raise(|| ErrorKind::Storage)?,
            path,
            digest: digest.to_hex().to_string(),
        })
    }

    /// The rewritten document left by an earlier run, if there is one.
    pub async fn stored(&self) -> Option<RewrittenDocument> {
        let path = self.layout.rewritten_path();
        let bytes = self.layout.storage().read(&path).await.ok()?;
        Some(RewrittenDocument {
            url: self.layout.locate(&path).ok()?,
            digest: blake3::hash(&bytes).to_hex().to_string(),
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BOOTSTRAP_MARKER;
    use haven_mirror::LocalAsset;
    use haven_storage::backend::MockBackend;
    use haven_storage::{BackendHandle, StorageBackend};
    use scraper::{Html, Selector};
    use std::path::Path;
    use std::sync::Arc;

    const ENTRY: &str = r#"<!DOCTYPE html>
<html ng-app="ops">
<head>
  <meta charset="utf-8">
  <meta http-equiv="Content-Security-Policy" content="default-src 'self' https://x">
  <base href="/">
  <link rel="stylesheet" href="/a/app.css" integrity="sha384-xyz" crossorigin="anonymous">
  <script src="https://cdn.example/angular.min.js"></script>
  <script src="/a/app.js"></script>
</head>
<body>
  <img src="img/logo.png" alt="logo">
  <div ng-include="'views/nav.html'"></div>
</body>
</html>
"#;

    fn setup(files: &[(&str, &str)]) -> (Arc<MockBackend>, Layout, DocumentRewriter, Manifest) {
        let storage = Arc::new(MockBackend::with_files(files.iter().copied()).with_name("device"));
        let handle: BackendHandle = storage.clone();
        let layout = Layout::new(handle);
        let policy =
            RewritePolicy::new(Url::parse("https://x").unwrap(), "/a/", layout.mirror_root_url().unwrap()).unwrap();
        let rewriter = DocumentRewriter::new(layout.clone(), policy, &BootstrapOptions::default()).unwrap();
        let manifest = Manifest::new(
            "v1",
            Url::parse("https://x").unwrap(),
            "/a/index.html",
            ["/a/index.html", "/a/app.js", "/a/app.css"],
        );
        (storage, layout, rewriter, manifest)
    }

    fn url_map(layout: &Layout, manifest: &Manifest) -> UrlMap {
        let mut map = UrlMap::new();
        for asset in &manifest.assets {
            let path = layout.mirror_path(asset).unwrap();
            let url = layout.locate(&path).unwrap();
            map.insert(&manifest.remote_url(asset).unwrap(), LocalAsset { path, url });
        }
        map
    }

    fn attr(html: &Html, selector: &str, name: &str) -> Option<String> {
        let selector = Selector::parse(selector).unwrap();
        html.select(&selector).next().and_then(|e| e.value().attr(name)).map(str::to_string)
    }

    #[tokio::test]
    async fn test_rewrite_entry() {
        let (storage, layout, rewriter, manifest) = setup(&[("mirror/a/index.html", ENTRY)]);
        let document = rewriter.rewrite_entry(&manifest, &url_map(&layout, &manifest)).await.unwrap();
        assert_eq!(document.path, Path::new("rewritten/index.html"));
        assert_eq!(document.url.as_str(), "file:///device/rewritten/index.html");

        let stored = storage.read(&document.path).await.unwrap();
        assert_eq!(blake3::hash(&stored).to_hex().to_string(), document.digest);
        let html = Html::parse_document(&String::from_utf8(stored).unwrap());

        assert_eq!(attr(&html, "base", "href").as_deref(), Some("https://x/a/"));
        assert_eq!(
            attr(&html, r#"script[src$="app.js"]"#, "src").as_deref(),
            Some("file:///device/mirror/a/app.js")
        );
        assert_eq!(
            attr(&html, r#"script[src*="cdn"]"#, "src").as_deref(),
            Some("https://cdn.example/angular.min.js")
        );
        assert_eq!(attr(&html, "link", "href").as_deref(), Some("file:///device/mirror/a/app.css"));
        assert_eq!(attr(&html, "link", "integrity"), None);
        assert_eq!(attr(&html, "link", "crossorigin"), None);
        assert_eq!(attr(&html, "img", "src").as_deref(), Some("file:///device/mirror/a/img/logo.png"));
        assert!(attr(&html, r#"meta[http-equiv]"#, "content").is_none());

        // The bootstrap sits immediately after <base>.
        let head = Selector::parse("head > *").unwrap();
        let order: Vec<_> = html.select(&head).map(|e| e.value().name().to_string()).collect();
        let base = order.iter().position(|n| n == "base").unwrap();
        assert_eq!(order[base + 1], "script");
        assert!(attr(&html, &format!("script[{BOOTSTRAP_MARKER}]"), BOOTSTRAP_MARKER).is_some());
    }

    #[tokio::test]
    async fn test_rewrite_is_idempotent() {
        let (_storage, layout, rewriter, manifest) = setup(&[]);
        let map = url_map(&layout, &manifest);
        let document_url = manifest.entry_url().unwrap();
        let once = rewriter.rewrite(ENTRY, &document_url, &map);
        let twice = rewriter.rewrite(ENTRY, &document_url, &map);
        assert_eq!(once, twice);
        assert_eq!(rewriter.rewrite(&once, &document_url, &map), once);
    }

    #[tokio::test]
    async fn test_rewritten_reference_locates_mirrored_file() {
        let (storage, layout, rewriter, manifest) =
            setup(&[("mirror/a/index.html", ENTRY), ("mirror/a/app.js", "go()")]);
        let document = rewriter.rewrite_entry(&manifest, &url_map(&layout, &manifest)).await.unwrap();
        let html = Html::parse_document(&String::from_utf8(storage.read(&document.path).await.unwrap()).unwrap());
        let src = attr(&html, r#"script[src$="app.js"]"#, "src").unwrap();
        let mirror_root = layout.mirror_root_url().unwrap();
        let relative = mirror_root.make_relative(&Url::parse(&src).unwrap()).unwrap();
        assert!(storage.exists(&layout.mirror_path(&relative).unwrap()).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_entry_keeps_previous_document() {
        let (storage, layout, rewriter, manifest) = setup(&[("rewritten/index.html", "previous")]);
        let err = rewriter.rewrite_entry(&manifest, &url_map(&layout, &manifest)).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::EntryMissing(entry) if entry == "/a/index.html"));
        assert_eq!(storage.read(Path::new("rewritten/index.html")).await.unwrap(), b"previous");
        assert_eq!(rewriter.stored().await.unwrap().digest, blake3::hash(b"previous").to_hex().to_string());
    }

    #[tokio::test]
    async fn test_unchanged_output_is_not_rewritten() {
        let (storage, layout, rewriter, manifest) = setup(&[("mirror/a/index.html", ENTRY)]);
        let map = url_map(&layout, &manifest);
        let first = rewriter.rewrite_entry(&manifest, &map).await.unwrap();
        let modified = storage.stat(&first.path).await.unwrap().modified;
        let second = rewriter.rewrite_entry(&manifest, &map).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(storage.stat(&second.path).await.unwrap().modified, modified);
    }
}
