//! Embedded fallback pages.

use rust_embed::Embed;
use std::borrow::Cow;

#[derive(Embed)]
#[folder = "../../assets/pages/"]
struct Pages;

const UNAVAILABLE: &str = "offline-unavailable.html";

/// Document for [`EntryPoint::Unavailable`](crate::EntryPoint::Unavailable).
pub fn placeholder() -> Cow<'static, str> {
    match Pages::get(UNAVAILABLE).map(|f| f.data) {
        Some(Cow::Borrowed(bytes)) => String::from_utf8_lossy(bytes),
        Some(Cow::Owned(bytes)) => Cow::Owned(String::from_utf8_lossy(&bytes).into_owned()),
        // Only reachable if the asset is dropped from the build.
        None => Cow::Borrowed("<!DOCTYPE html><title>Offline</title><p>Not available offline yet.</p>"),
    }
}
