//! Minimal HTTP/1.1 server that supports HEAD and Range GET for integration tests.
//!
//! Serves a single static body on every path. Responds to HEAD with
//! Content-Length and Accept-Ranges: bytes; responds to GET with Range with
//! 206 Partial Content. Counts requests so tests can assert how many fetches
//! a download issued.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone)]
pub struct RangeServerOptions {
    /// If false, HEAD returns 405 (simulates servers that block HEAD).
    pub head_allowed: bool,
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// If false, omit `Accept-Ranges: bytes` header even if ranges work.
    pub advertise_ranges: bool,
    /// `Content-Type` sent on every response.
    pub content_type: Option<String>,
    /// A ranged GET starting at this offset answers 500.
    pub fail_range_start: Option<u64>,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            head_allowed: true,
            support_ranges: true,
            advertise_ranges: true,
            content_type: None,
            fail_range_start: None,
        }
    }
}

/// Handle to a running server. The server runs until the process exits.
#[derive(Debug, Clone)]
pub struct RangeServer {
    base: String,
    gets: Arc<AtomicUsize>,
    heads: Arc<AtomicUsize>,
}

impl RangeServer {
    /// URL of `path` on this server (e.g. `url("track.mp3")`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path.trim_start_matches('/'))
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn head_count(&self) -> usize {
        self.heads.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread serving `body`.
pub fn start(body: Vec<u8>) -> RangeServer {
    start_with_options(body, RangeServerOptions::default())
}

/// Like `start` but allows customizing server behavior (HEAD blocked, ranges missing, etc.).
pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let server = RangeServer {
        base: format!("http://127.0.0.1:{}/", port),
        gets: Arc::new(AtomicUsize::new(0)),
        heads: Arc::new(AtomicUsize::new(0)),
    };
    let counters = server.clone();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let opts = opts.clone();
            let counters = counters.clone();
            thread::spawn(move || handle(stream, &body, &opts, &counters));
        }
    });
    server
}

fn handle(
    mut stream: std::net::TcpStream,
    body: &[u8],
    opts: &RangeServerOptions,
    counters: &RangeServer,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, range) = parse_request(request);
    let total = body.len() as u64;
    let accept_ranges = if opts.advertise_ranges && opts.support_ranges {
        "Accept-Ranges: bytes\r\n".to_string()
    } else {
        String::new()
    };
    let content_type = opts
        .content_type
        .as_ref()
        .map(|ct| format!("Content-Type: {}\r\n", ct))
        .unwrap_or_default();

    if method.eq_ignore_ascii_case("HEAD") {
        counters.heads.fetch_add(1, Ordering::SeqCst);
        if !opts.head_allowed {
            let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
            return;
        }
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}{}\r\n",
            total, accept_ranges, content_type
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }
    if method.eq_ignore_ascii_case("GET") {
        counters.gets.fetch_add(1, Ordering::SeqCst);
        let range = range.filter(|_| opts.support_ranges);
        if let (Some((start, _)), Some(fail)) = (range, opts.fail_range_start) {
            if start == fail {
                let _ = stream.write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n");
                return;
            }
        }
        let (status, range_header, slice) = match range {
            Some((start, end_incl)) => {
                let start = start.min(total);
                let end_incl = end_incl.min(total.saturating_sub(1));
                if start > end_incl || total == 0 {
                    (
                        "416 Range Not Satisfiable",
                        format!("bytes */{}", total),
                        &body[0..0],
                    )
                } else {
                    let start = start as usize;
                    let end_excl = (end_incl + 1).min(total) as usize;
                    (
                        "206 Partial Content",
                        format!("bytes {}-{}/{}", start, end_excl - 1, total),
                        &body[start..end_excl],
                    )
                }
            }
            None => (
                "200 OK",
                format!("bytes 0-{}/{}", total.saturating_sub(1), total),
                body,
            ),
        };
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Range: {}\r\n{}{}\r\n",
            status,
            slice.len(),
            range_header,
            accept_ranges,
            content_type
        );
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.write_all(slice);
        return;
    }
    let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
}

/// Returns (method, optional (start, end_inclusive) for Range: bytes=X-Y).
fn parse_request(request: &str) -> (&str, Option<(u64, u64)>) {
    let mut method = "";
    let mut range = None;
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            method = line.split_whitespace().next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if value.to_lowercase().starts_with("bytes=") {
                    if let Some((a, b)) = value[6..].trim().split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim();
                        let end_incl = if end.is_empty() {
                            u64::MAX
                        } else {
                            end.parse::<u64>().unwrap_or(0)
                        };
                        range = Some((start, end_incl));
                    }
                }
            }
        }
    }
    (method, range)
}
