//! One chunk: ranged GET copied into the chunk's slice of the buffer.

use std::time::Instant;

use crate::fetch::RangeFetcher;
use crate::segmenter::Chunk;

use super::DownloadError;

/// Fetches `chunk` and copies the body into `slot`, which must be exactly
/// `chunk.len()` bytes. A body of any other length is an error and leaves
/// `slot` untouched.
pub(super) fn fetch_chunk(
    fetcher: &RangeFetcher,
    url: &str,
    chunk: &Chunk,
    slot: &mut [u8],
    deadline: Option<Instant>,
) -> Result<u64, DownloadError> {
    tracing::debug!(url, chunk = chunk.index, start = chunk.start, end = chunk.end_inclusive, "chunk dispatched");
    let fetched = fetcher
        .fetch(url, Some(chunk.byte_range()), deadline)
        .map_err(|source| DownloadError::Chunk {
            index: chunk.index,
            source,
        })?;

    let expected = chunk.len();
    let received = fetched.body.len() as u64;
    if received != expected || slot.len() as u64 != expected {
        return Err(DownloadError::PartialChunk {
            index: chunk.index,
            expected,
            received,
        });
    }
    slot.copy_from_slice(&fetched.body);
    tracing::debug!(url, chunk = chunk.index, bytes = received, status = fetched.status, "chunk complete");
    Ok(received)
}
