// Bounded bulk downloader: fetches every URI of a job into one destination
// directory, with a process-wide cap on in-flight transfers and per-URI
// immediate retry.

use crate::error::EngineError;
use crate::fetch::SegmentFetcher;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Destination file name for a segment URI: the final path component with any
/// query or fragment stripped. Media playlists name their segments uniquely,
/// so within one job this mapping is 1:1 and no two downloads share a path.
pub fn file_name_for(url: &str) -> &str {
    // Query and fragment go first so a path-like query value never leaks
    // into the file name.
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

pub struct BulkDownloader {
    fetcher: Arc<dyn SegmentFetcher>,
    limiter: Arc<Semaphore>,
    max_attempts: u32,
}

impl BulkDownloader {
    /// `limiter` is the process-wide concurrency cap, shared across all jobs
    /// running concurrently; it is injected rather than owned so several jobs
    /// contend for the same slots.
    pub fn new(fetcher: Arc<dyn SegmentFetcher>, limiter: Arc<Semaphore>, max_attempts: u32) -> Self {
        Self {
            fetcher,
            limiter,
            max_attempts,
        }
    }

    /// Download every URI into `dest`. Waits for all URIs to finish (success
    /// or retry exhaustion) before returning; if any URI exhausted its
    /// retries the aggregate error reports how many, but files written for
    /// the succeeding URIs are left in place for the caller to inspect or
    /// clean up.
    pub async fn download_all(
        &self,
        urls: &[String],
        dest: &Path,
        token: &CancellationToken,
    ) -> Result<(), EngineError> {
        let mut tasks: FuturesUnordered<_> = urls
            .iter()
            .map(|url| self.download_one(url, dest, token))
            .collect();

        let total = urls.len();
        let mut failed = 0usize;
        while let Some(result) = tasks.next().await {
            if result.is_err() {
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(EngineError::SegmentsIncomplete { failed, total });
        }
        Ok(())
    }

    /// Download a single URI, re-acquiring a concurrency slot on every
    /// attempt so a stuck retry never pins a slot across its backoff.
    async fn download_one(
        &self,
        url: &str,
        dest: &Path,
        token: &CancellationToken,
    ) -> Result<(), EngineError> {
        let path = dest.join(file_name_for(url));
        let mut last_err = EngineError::configuration("download retry budget is zero");

        for attempt in 0..self.max_attempts {
            let permit = tokio::select! {
                _ = token.cancelled() => {
                    warn!(url, "segment download cancelled");
                    return Err(EngineError::Cancelled);
                }
                permit = self.limiter.acquire() => {
                    permit.map_err(|_| EngineError::Cancelled)?
                }
            };

            // Race the in-flight fetch against cancellation so a stalled
            // transfer never pins the job past a cancel.
            let result = tokio::select! {
                _ = token.cancelled() => {
                    warn!(url, "segment download cancelled");
                    return Err(EngineError::Cancelled);
                }
                result = self.fetch_to_file(url, &path) => result,
            };
            drop(permit);

            match result {
                Ok(()) => return Ok(()),
                Err(EngineError::Cancelled) => return Err(EngineError::Cancelled),
                Err(e) => {
                    debug!(url, attempt = attempt + 1, error = %e, "segment attempt failed");
                    last_err = e;
                }
            }
        }

        warn!(url, error = %last_err, "failed to download segment");
        Err(last_err)
    }

    async fn fetch_to_file(&self, url: &str, path: &Path) -> Result<(), EngineError> {
        let bytes = self.fetcher.fetch(url).await?;
        let mut file = tokio::fs::File::create(path).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Segment file paths in playlist order, for hand-off to the assembler.
pub fn ordered_segment_paths(urls: &[String], dest: &Path) -> Vec<PathBuf> {
    urls.iter().map(|url| dest.join(file_name_for(url))).collect()
}
