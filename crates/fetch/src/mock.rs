//! Scripted fetcher for testing.

use crate::Fetcher;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use url::Url;

/// Fetcher that serves canned bodies and records every request.
///
/// URLs without a registered body fail with a `404` status error, the same
/// way a real server would answer for an asset that isn't there.
///
/// # Examples
///
/// ```
/// use haven_fetch::{Fetcher, MockFetcher};
/// use url::Url;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = MockFetcher::with_responses([("https://x/a/app.js", "console.log(1)")]);
/// let body = fetcher.fetch(&Url::parse("https://x/a/app.js")?).await.unwrap();
/// assert_eq!(body, b"console.log(1)");
/// assert_eq!(fetcher.request_count().await, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MockFetcher {
    responses: RwLock<HashMap<String, std::result::Result<Vec<u8>, ErrorKind>>>,
    requests: RwLock<Vec<Url>>,
}
impl MockFetcher {
    /// Create a fetcher that answers the given URLs with the given bodies.
    ///
    /// Panics on an unparseable URL; test setup should be correct.
    pub fn with_responses(responses: impl IntoIterator<Item = (impl AsRef<str>, impl Into<Vec<u8>>)>) -> Self {
        let responses = responses
            .into_iter()
            .map(|(url, body)| {
                let Ok(url) = Url::parse(url.as_ref()) else {
                    panic!("MockFetcher::with_responses: invalid url {}", url.as_ref());
                };
                (url.to_string(), Ok(body.into()))
            })
            .collect();
        Self {
            responses: RwLock::new(responses),
            requests: RwLock::default(),
        }
    }

    /// Make `url` fail with the given error.
    pub async fn fail(&self, url: &str, error: ErrorKind) {
        let Ok(parsed) = Url::parse(url) else {
            panic!("MockFetcher::fail: invalid url {url}");
        };
        self.responses.write().await.insert(parsed.to_string(), Err(error));
    }

    /// Every URL requested so far, in order.
    pub async fn requests(&self) -> Vec<Url> {
        self.requests.read().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        self.requests.write().await.push(url.clone());
        match self.responses.read().await.get(url.as_str()) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(kind)) => exn::bail!(kind.clone()),
            None => exn::bail!(ErrorKind::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_url_is_not_found() {
        let fetcher = MockFetcher::default();
        let err = fetcher.fetch(&Url::parse("https://x/missing.js").unwrap()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Status { status: 404, .. }));
        assert_eq!(fetcher.request_count().await, 1);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let fetcher = MockFetcher::with_responses([("https://x/a.js", "a")]);
        fetcher.fail("https://x/a.js", ErrorKind::Transport("reset".to_string())).await;
        let err = fetcher.fetch(&Url::parse("https://x/a.js").unwrap()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Transport(_)));
    }
}
