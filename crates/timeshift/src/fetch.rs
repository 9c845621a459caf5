// HTTP fetching seam. The trait exists so the downloader and orchestrator can
// be exercised without a network in tests.

use crate::error::EngineError;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Cap on one segment or playlist transfer; a stalled connection fails the
/// attempt instead of hanging it.
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait SegmentFetcher: Send + Sync {
    /// Fetch the full body at `url`. Non-2xx statuses are errors.
    async fn fetch(&self, url: &str) -> Result<Bytes, EngineError>;
}

/// [`SegmentFetcher`] backed by a shared [`reqwest::Client`].
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SegmentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, EngineError> {
        let response = self.client.get(url).timeout(self.timeout).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::http_status(status, url, "fetch"));
        }
        Ok(response.bytes().await?)
    }
}

/// Fetch a media playlist and return its segment URIs in playlist order.
///
/// No internal retry; a network failure here is the caller's retryable
/// condition.
pub async fn fetch_chunklist(
    fetcher: &dyn SegmentFetcher,
    uri: &str,
) -> Result<Vec<String>, EngineError> {
    let bytes = fetcher.fetch(uri).await?;
    Ok(chunklist::list_segments(&bytes)?)
}
