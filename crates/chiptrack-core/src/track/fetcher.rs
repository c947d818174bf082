//! Probe, download and classify one track.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::downloader::{ChunkedDownloader, DownloadError};
use crate::fetch::HttpTransport;

use super::{AudioFileType, Track, TrackMetadata};

#[derive(Debug, thiserror::Error)]
#[error("failed to fetch track {url}: {source}")]
pub struct TrackError {
    pub url: String,
    #[source]
    pub source: DownloadError,
}

/// Builds [`Track`]s from direct download URLs.
#[derive(Debug, Clone)]
pub struct TrackFetcher {
    downloader: ChunkedDownloader,
    workers: usize,
    timeout: Duration,
}

impl TrackFetcher {
    /// `timeout` bounds one whole track: the HEAD probe and every chunk.
    pub fn new(transport: Arc<dyn HttpTransport>, workers: usize, timeout: Duration) -> Self {
        Self {
            downloader: ChunkedDownloader::new(transport),
            workers,
            timeout,
        }
    }

    /// HEAD `url`, download it with the configured worker count and wrap the
    /// bytes in a seekable [`Track`]. Blocking.
    pub fn get_track(&self, url: &str, metadata: TrackMetadata) -> Result<Track, TrackError> {
        let deadline = Instant::now() + self.timeout;
        let wrap = |source| TrackError {
            url: url.to_string(),
            source,
        };

        let target = self.downloader.probe(url, Some(deadline)).map_err(wrap)?;
        let bytes = self
            .downloader
            .download(&target, self.workers, Some(deadline))
            .map_err(wrap)?;
        let file_type = AudioFileType::classify(url, target.content_type.as_deref());

        tracing::info!(
            url,
            title = %metadata.title,
            file_type = %file_type,
            bytes = bytes.len(),
            "track fetched"
        );
        Ok(Track::from_bytes(metadata, file_type, bytes))
    }
}
