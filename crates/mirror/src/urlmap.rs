use std::collections::HashMap;
use std::path::PathBuf;
use url::Url;

/// A mirrored file: its storage path and the `file://` URL a hosted document
/// loads it through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAsset {
    pub path: PathBuf,
    pub url: Url,
}

/// Lookup from remote identity to local identity, built once per precache
/// run and never persisted.
///
/// Each manifest entry contributes exactly two keys: the fully-qualified
/// remote URL and its root-relative path, both mapping to the same
/// [`LocalAsset`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlMap {
    entries: HashMap<String, LocalAsset>,
}
impl UrlMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record both keys of a manifest entry.
    pub fn insert(&mut self, remote: &Url, asset: LocalAsset) {
        self.entries.insert(Self::absolute_key(remote), asset.clone());
        self.entries.insert(remote.path().to_string(), asset);
    }

    /// Look up a key verbatim (either an absolute URL or a root-relative path).
    pub fn get(&self, key: &str) -> Option<&LocalAsset> {
        self.entries.get(key)
    }

    /// Look up a resolved reference: absolute form first, then path form.
    ///
    /// Fragments never take part in the match; the query only matters for
    /// the absolute form, so `app.js?v=3` still finds `/app.js` by path.
    pub fn lookup(&self, resolved: &Url) -> Option<&LocalAsset> {
        self.entries.get(&Self::absolute_key(resolved)).or_else(|| self.entries.get(resolved.path()))
    }

    /// Number of keys (twice the number of distinct entries).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LocalAsset)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn absolute_key(url: &Url) -> String {
        let mut url = url.clone();
        url.set_fragment(None);
        url.to_string()
    }
}
