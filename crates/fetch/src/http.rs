//! HTTP fetcher built on [`reqwest`].

use crate::error::{ErrorKind, Result};
use crate::Fetcher;
use async_trait::async_trait;
use exn::ResultExt;
use tracing::instrument;
use url::Url;

const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Fetches resources over HTTP(S).
///
/// No explicit timeouts are configured; requests rely on the transport's
/// defaults.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}
impl HttpFetcher {
    /// Build a fetcher with an optional custom user agent.
    pub fn new(user_agent: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
            .build()
            .or_raise(|| ErrorKind::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ErrorKind::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            exn::bail!(ErrorKind::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.bytes().await.map_err(|e| ErrorKind::Body(e.to_string()))?;
        tracing::trace!(status = status.as_u16(), bytes = body.len(), "Fetched remote resource");
        Ok(body.to_vec())
    }
}
