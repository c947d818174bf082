//! Range-partitioned downloader.
//!
//! Probes a URL into a [`DownloadTarget`], then either fetches the whole
//! resource in one GET (origin without range support) or splits it into one
//! chunk per worker, fetches the chunks concurrently and assembles them into
//! a single pre-sized buffer. Any chunk failure fails the whole download; no
//! partial buffer is ever returned.

mod run;
mod segment;
mod single;


use std::sync::Arc;
use std::time::Instant;

use crate::fetch::{FetchError, HttpTransport, RangeFetcher};
use crate::fetch_head::{self, HeadResult};
use crate::segmenter::plan_chunks;

/// What to download, built once per attempt from a HEAD probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub url: String,
    /// `Content-Length` from the probe. Required on the ranged path.
    pub total_length: Option<u64>,
    pub supports_range: bool,
    pub content_type: Option<String>,
}

impl DownloadTarget {
    pub fn from_head(url: impl Into<String>, head: &HeadResult) -> Self {
        Self {
            url: url.into(),
            total_length: head.content_length,
            supports_range: head.accept_ranges,
            content_type: head.content_type.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("worker count must be at least 1")]
    NoWorkers,
    #[error("{url}: missing or unparseable Content-Length, cannot split a ranged download")]
    MissingContentLength { url: String },
    #[error("{url}: Content-Length {length} does not fit in memory")]
    TooLarge { url: String, length: u64 },
    #[error("HEAD probe failed: {0}")]
    Probe(#[source] FetchError),
    #[error("chunk {index} failed: {source}")]
    Chunk {
        index: usize,
        #[source]
        source: FetchError,
    },
    #[error("chunk {index}: expected {expected} bytes, received {received}")]
    PartialChunk {
        index: usize,
        expected: u64,
        received: u64,
    },
    #[error("chunk {index}: worker panicked")]
    WorkerPanicked { index: usize },
    #[error("whole-resource fetch failed: {0}")]
    Whole(#[source] FetchError),
}

impl DownloadError {
    /// Chunk index for chunk-level failures.
    pub fn chunk_index(&self) -> Option<usize> {
        match self {
            DownloadError::Chunk { index, .. }
            | DownloadError::PartialChunk { index, .. }
            | DownloadError::WorkerPanicked { index } => Some(*index),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChunkedDownloader {
    fetcher: RangeFetcher,
}

impl ChunkedDownloader {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            fetcher: RangeFetcher::new(transport),
        }
    }

    pub fn fetcher(&self) -> &RangeFetcher {
        &self.fetcher
    }

    /// HEAD `url` and build the target for [`ChunkedDownloader::download`].
    pub fn probe(&self, url: &str, deadline: Option<Instant>) -> Result<DownloadTarget, DownloadError> {
        let head = fetch_head::probe(self.fetcher.transport(), url, deadline)
            .map_err(DownloadError::Probe)?;
        Ok(DownloadTarget::from_head(url, &head))
    }

    /// Downloads `target` with up to `workers` concurrent range requests.
    ///
    /// Blocks until every worker has finished. Without range support the
    /// resource is fetched in a single GET and `workers` is ignored.
    pub fn download(
        &self,
        target: &DownloadTarget,
        workers: usize,
        deadline: Option<Instant>,
    ) -> Result<Vec<u8>, DownloadError> {
        if workers == 0 {
            return Err(DownloadError::NoWorkers);
        }
        let started = Instant::now();

        if !target.supports_range {
            let body = single::fetch_whole(&self.fetcher, target, deadline)?;
            tracing::info!(
                url = %target.url,
                bytes = body.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "downloaded without ranges"
            );
            return Ok(body);
        }

        let total_len = target
            .total_length
            .ok_or_else(|| DownloadError::MissingContentLength {
                url: target.url.clone(),
            })?;
        let mut buffer = allocate(&target.url, total_len)?;
        let chunks = plan_chunks(total_len, workers);
        run::run_chunks(&self.fetcher, &target.url, &chunks, &mut buffer, deadline)?;

        tracing::info!(
            url = %target.url,
            bytes = total_len,
            chunks = chunks.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "downloaded"
        );
        Ok(buffer)
    }
}

/// Zeroed buffer of `len` bytes; a length the process cannot hold is an error.
fn allocate(url: &str, len: u64) -> Result<Vec<u8>, DownloadError> {
    let too_large = || DownloadError::TooLarge {
        url: url.to_string(),
        length: len,
    };
    let len = usize::try_from(len).map_err(|_| too_large())?;
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).map_err(|_| too_large())?;
    buffer.resize(len, 0);
    Ok(buffer)
}
