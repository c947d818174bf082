//! Whole-resource GET (origin without range support).

use std::time::Instant;

use crate::fetch::RangeFetcher;

use super::{DownloadError, DownloadTarget};

/// One GET without a `Range` header; the body is returned verbatim.
pub(super) fn fetch_whole(
    fetcher: &RangeFetcher,
    target: &DownloadTarget,
    deadline: Option<Instant>,
) -> Result<Vec<u8>, DownloadError> {
    let fetched = fetcher
        .fetch(&target.url, None, deadline)
        .map_err(DownloadError::Whole)?;
    if let Some(expected) = target.total_length {
        if fetched.body.len() as u64 != expected {
            tracing::warn!(
                url = %target.url,
                expected,
                received = fetched.body.len(),
                "body length differs from probed Content-Length"
            );
        }
    }
    Ok(fetched.body)
}
