//! The single rule deciding where a reference should point when offline.
//!
//! The Document Rewriter applies it to attribute values ahead of time and the
//! runtime interceptor applies it to requests the page issues later. Both go
//! through [`RewritePolicy`] so the two can never disagree; the interceptor
//! script receives the same settings via [`RewritePolicy::script_config`].

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use haven_mirror::UrlMap;
use regex::Regex;
use serde::Serialize;
use url::Url;

/// Relative names the hosted framework loads templates by, e.g.
/// `views/main.html`. No scheme, no leading slash, no parent traversal.
pub const DEFAULT_TEMPLATE_PATTERN: &str = r"^[A-Za-z0-9_\-][A-Za-z0-9_\-./]*\.html$";

#[derive(Debug, Clone)]
pub struct RewritePolicy {
    origin: Url,
    app_root: String,
    app_base: Url,
    template_pattern: Regex,
    template_root: String,
    mirror_root: Url,
}

impl RewritePolicy {
    /// Policy for an application served from `app_root` under `origin`,
    /// mirrored below `mirror_root` (a directory URL, usually from
    /// [`Layout::mirror_root_url`](haven_mirror::Layout::mirror_root_url)).
    ///
    /// Templates default to [`DEFAULT_TEMPLATE_PATTERN`] under the app root.
    pub fn new(origin: Url, app_root: &str, mirror_root: Url) -> Result<Self> {
        if !matches!(origin.scheme(), "http" | "https") {
            exn::bail!(ErrorKind::InvalidPolicy(format!("origin must be http(s): {origin}")));
        }
        let app_root = directory_path(app_root);
        let app_base = origin.join(&app_root).or_raise(|| ErrorKind::InvalidPolicy(app_root.clone()))?;
        let mirror_root = as_directory(mirror_root);
        let template_pattern =
            Regex::new(DEFAULT_TEMPLATE_PATTERN).or_raise(|| ErrorKind::InvalidPolicy(DEFAULT_TEMPLATE_PATTERN.into()))?;
        Ok(Self {
            origin,
            template_root: app_root.clone(),
            app_root,
            app_base,
            template_pattern,
            mirror_root,
        })
    }

    /// Override the template naming convention and the root-relative prefix
    /// template names are mapped under.
    pub fn with_templates(mut self, pattern: &str, root: &str) -> Result<Self> {
        self.template_pattern = Regex::new(pattern).or_raise(|| ErrorKind::InvalidPolicy(pattern.to_string()))?;
        self.template_root = directory_path(root);
        Ok(self)
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn app_root(&self) -> &str {
        &self.app_root
    }

    /// The application root under the network origin. This is what the
    /// document's base reference is normalized to.
    pub fn app_base(&self) -> &Url {
        &self.app_base
    }

    pub fn mirror_root(&self) -> &Url {
        &self.mirror_root
    }

    fn same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin.origin()
    }

    fn is_template(&self, value: &str) -> bool {
        scheme_of(value).is_none() && !value.starts_with('/') && self.template_pattern.is_match(value)
    }

    /// Mirror location for a root-relative path. `None` for the bare root,
    /// which is a directory rather than an asset.
    fn mirror_url(&self, path: &str, fragment: Option<&str>) -> Option<Url> {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            return None;
        }
        // `./` keeps a colon in the first segment from parsing as a scheme.
        let mut url = self.mirror_root.join(&format!("./{path}")).ok()?;
        url.set_fragment(fragment);
        Some(url)
    }

    /// Where a reference found in (or requested by) a document at `base`
    /// should point instead, or `None` to leave it untouched.
    ///
    /// In order: a hit in `url_map`, a template-relative name mapped under
    /// the template root, a same-origin reference mapped by path. Anything
    /// cross-origin or not `http(s)` is left alone. Queries are dropped from
    /// mirror paths since the mirror is keyed by path; fragments are kept.
    pub fn map_reference(&self, raw: &str, base: &Url, url_map: Option<&UrlMap>) -> Option<Url> {
        let value = raw.trim();
        if value.is_empty() || value.starts_with('#') {
            return None;
        }
        if scheme_of(value).is_some_and(|scheme| !matches!(scheme.as_str(), "http" | "https")) {
            return None;
        }
        let resolved = base.join(value).ok()?;
        let same_origin = self.same_origin(&resolved);
        if same_origin && let Some(hit) = url_map.and_then(|map| map.lookup(&resolved)) {
            let mut url = hit.url.clone();
            url.set_fragment(resolved.fragment());
            return Some(url);
        }
        if self.is_template(value) {
            let (name, fragment) = match value.split_once('#') {
                Some((name, fragment)) => (name, Some(fragment)),
                None => (value, None),
            };
            return self.mirror_url(&format!("{}{name}", self.template_root), fragment);
        }
        if same_origin {
            return self.mirror_url(resolved.path(), resolved.fragment());
        }
        None
    }

    /// Runtime form of [`map_reference`](Self::map_reference) for a request
    /// issued by running page code.
    ///
    /// Passes `request` through unchanged when not offline and the document
    /// wasn't itself loaded from local storage. A locally loaded document
    /// resolves relative requests against the network application root, the
    /// same base its rewritten `<base>` declares.
    pub fn resolve(&self, request: &str, current_document: &Url, offline: bool) -> String {
        let local = current_document.scheme() == "file";
        if !offline && !local {
            return request.to_string();
        }
        let base = if local { &self.app_base } else { current_document };
        match self.map_reference(request, base, None) {
            Some(url) => url.into(),
            None => request.to_string(),
        }
    }

    /// Settings the in-page scripts need to apply this policy themselves.
    pub fn script_config(&self) -> ScriptPolicy<'_> {
        ScriptPolicy {
            origin: self.origin.origin().ascii_serialization(),
            app_root: &self.app_root,
            app_base: self.app_base.as_str(),
            template_pattern: self.template_pattern.as_str(),
            template_root: &self.template_root,
            mirror_root: self.mirror_root.as_str(),
        }
    }
}

/// Serialized view of a [`RewritePolicy`] handed to in-page scripts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptPolicy<'a> {
    pub origin: String,
    pub app_root: &'a str,
    pub app_base: &'a str,
    pub template_pattern: &'a str,
    pub template_root: &'a str,
    pub mirror_root: &'a str,
}

/// Lowercased scheme of an absolute reference, if it has one.
fn scheme_of(value: &str) -> Option<String> {
    let (scheme, _) = value.split_once(':')?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then(|| scheme.to_ascii_lowercase())
}

/// `a/b` → `/a/b/`
fn directory_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    match trimmed.is_empty() {
        true => "/".to_string(),
        false => format!("/{trimmed}/"),
    }
}

fn as_directory(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
