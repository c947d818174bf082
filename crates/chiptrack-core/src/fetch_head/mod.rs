//! HTTP HEAD / metadata probing.
//!
//! Confirms `Content-Length` and `Accept-Ranges: bytes` before a download is
//! partitioned, and captures `Content-Type` for track classification.

mod parse;

use std::time::Instant;

use crate::fetch::{execute_checked, FetchError, HttpTransport, Request};

/// Result of a HEAD request: key headers needed for a ranged download.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadResult {
    /// Total size in bytes, if `Content-Length` is present and numeric.
    pub content_length: Option<u64>,
    /// True if server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

/// Performs a HEAD request through `transport` and returns parsed metadata.
///
/// Non-2xx responses are errors. Blocks the current thread; call from
/// `spawn_blocking` if used from async code.
pub fn probe(
    transport: &dyn HttpTransport,
    url: &str,
    deadline: Option<Instant>,
) -> Result<HeadResult, FetchError> {
    let request = Request::head(url).deadline(deadline);
    let response = execute_checked(transport, &request)?;
    let head = parse::parse_headers(&response.headers);
    tracing::debug!(
        url,
        content_length = ?head.content_length,
        accept_ranges = head.accept_ranges,
        "HEAD probe"
    );
    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{Method, Response, TransportError};

    struct Fixed(u32, Vec<(String, String)>);

    impl HttpTransport for Fixed {
        fn execute(&self, request: &Request) -> Result<Response, TransportError> {
            assert_eq!(request.method, Method::Head);
            Ok(Response {
                status: self.0,
                headers: self.1.clone(),
                body: Vec::new(),
            })
        }
    }

    #[test]
    fn probe_parses_headers() {
        let t = Fixed(
            200,
            vec![
                ("content-length".into(), "1000".into()),
                ("ACCEPT-RANGES".into(), "bytes".into()),
            ],
        );
        let head = probe(&t, "http://host/a.mp3", None).unwrap();
        assert_eq!(head.content_length, Some(1000));
        assert!(head.accept_ranges);
    }

    #[test]
    fn probe_rejects_non_success() {
        let t = Fixed(403, Vec::new());
        let err = probe(&t, "http://host/a.mp3", None).unwrap_err();
        assert_eq!(err.status(), Some(403));
    }
}
