//! Text-to-text transforms making up the rewrite pipeline.
//!
//! Each transform rescans the document it is given and splices its edits into
//! the original text, so transforms are independent of each other and every
//! one of them leaves already-rewritten output unchanged.

mod base;
mod blocking;
mod bootstrap;
mod references;

pub use self::base::BaseHref;
pub use self::blocking::StripBlocking;
pub use self::bootstrap::{BOOTSTRAP_MARKER, BootstrapOptions, CannedResponse, InjectBootstrap};
pub use self::references::{REFERENCE_ATTRIBUTES, RewriteReferences};
use crate::RewritePolicy;
use crate::scan::Tag;
use haven_mirror::UrlMap;
use url::Url;

/// Everything a transform may consult besides the document text.
#[derive(Clone, Copy)]
pub struct RewriteContext<'a> {
    pub document_url: &'a Url,
    pub url_map: &'a UrlMap,
    pub policy: &'a RewritePolicy,
}

pub trait Transform: Send + Sync {
    /// Used for logging only.
    fn name(&self) -> &'static str;

    fn apply(&self, html: &str, context: &RewriteContext<'_>) -> String;
}

/// Where new head content goes when there is no better anchor: straight
/// after `<head>`, else after `<html>`, else at the very start.
pub(crate) fn head_insertion_point(tags: &[Tag]) -> usize {
    tags.iter()
        .find(|t| t.is("head"))
        .or_else(|| tags.iter().find(|t| t.is("html")))
        .map_or(0, |t| t.span.end)
}

pub(crate) fn first<'t>(tags: &'t [Tag], name: &str) -> Option<&'t Tag> {
    tags.iter().find(|t| t.is(name))
}
