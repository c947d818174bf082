//! HTTP GET with an optional byte range.
//!
//! [`RangeFetcher`] is the I/O leaf of the downloader: it issues exactly one
//! request through an injected [`HttpTransport`] and turns non-2xx statuses
//! into [`FetchError::Status`]. It keeps no state between calls.

mod curl_transport;
mod transport;

pub use curl_transport::{CurlOptions, CurlTransport};
pub use transport::{HttpTransport, Method, Request, Response, TransportError};

use std::sync::Arc;
use std::time::Instant;

/// Inclusive byte range `[start, end_inclusive]` as sent in a `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end_inclusive: u64,
}

impl ByteRange {
    pub fn new(start: u64, end_inclusive: u64) -> Self {
        Self { start, end_inclusive }
    }

    pub fn len(&self) -> u64 {
        (self.end_inclusive + 1).saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `Range` header value: `bytes=start-end`.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end_inclusive)
    }
}

/// Body and status of a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub status: u32,
    pub body: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{method} {url} failed: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: TransportError,
    },
    #[error("{method} {url} returned HTTP {status}")]
    Status {
        method: Method,
        url: String,
        status: u32,
    },
}

impl FetchError {
    /// HTTP status for [`FetchError::Status`].
    pub fn status(&self) -> Option<u32> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Transport { .. } => None,
        }
    }
}

/// Executes `request`, mapping transport failures and non-2xx statuses to [`FetchError`].
pub(crate) fn execute_checked(
    transport: &dyn HttpTransport,
    request: &Request,
) -> Result<Response, FetchError> {
    let response = transport
        .execute(request)
        .map_err(|source| FetchError::Transport {
            method: request.method,
            url: request.url.clone(),
            source,
        })?;
    if !response.is_success() {
        return Err(FetchError::Status {
            method: request.method,
            url: request.url.clone(),
            status: response.status,
        });
    }
    Ok(response)
}

#[derive(Clone)]
pub struct RangeFetcher {
    transport: Arc<dyn HttpTransport>,
}

impl RangeFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &dyn HttpTransport {
        self.transport.as_ref()
    }

    /// One GET of `url`; `range == None` fetches the whole resource.
    pub fn fetch(
        &self,
        url: &str,
        range: Option<ByteRange>,
        deadline: Option<Instant>,
    ) -> Result<Fetched, FetchError> {
        let mut request = Request::get(url).deadline(deadline);
        if let Some(range) = range {
            request = request.header("Range", range.header_value());
        }
        let response = execute_checked(self.transport(), &request)?;
        Ok(Fetched {
            status: response.status,
            body: response.body,
        })
    }
}

impl std::fmt::Debug for RangeFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeFetcher").finish_non_exhaustive()
    }
}
