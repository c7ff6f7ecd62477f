//! Fetching remote resources into memory.
//!
//! The mirror never talks to the network directly; it goes through a
//! [`Fetcher`] so the HTTP client can be swapped for [`MockFetcher`] in tests
//! (behind the `mock` feature).

pub mod error;
mod http;
#[cfg(feature = "mock")]
mod mock;

pub use crate::http::HttpFetcher;
#[cfg(feature = "mock")]
pub use crate::mock::MockFetcher;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

pub type FetcherHandle = Arc<dyn Fetcher + Send + Sync>;

/// Retrieves the full body of a remote resource.
///
/// Implementations must treat anything other than a complete, successful
/// response as an error: the caller writes whatever comes back straight into
/// the mirror, and an error page mirrored under an asset's name is worse than
/// a missing file.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Name of the fetcher, for logging only.
    fn name(&self) -> &str;

    /// Fetch `url`, returning the complete response body.
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>>;
}
