//! `HttpTransport` backed by libcurl: one Easy handle per request.

use std::str;
use std::time::{Duration, Instant};

use super::transport::{HttpTransport, Method, Request, Response, TransportError};

/// Curl options shared by every request of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Abort if throughput stays below `low_speed_limit` bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    pub max_redirections: u32,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(30),
            max_redirections: 10,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurlTransport {
    opts: CurlOptions,
}

impl CurlTransport {
    pub fn new(opts: CurlOptions) -> Self {
        Self { opts }
    }
}

impl HttpTransport for CurlTransport {
    fn execute(&self, request: &Request) -> Result<Response, TransportError> {
        let timeout = match request.deadline {
            Some(deadline) => {
                let now = Instant::now();
                if deadline <= now {
                    return Err(TransportError::DeadlineExceeded);
                }
                Some(deadline - now)
            }
            None => None,
        };

        let mut easy = curl::easy::Easy::new();
        easy.url(&request.url)?;
        easy.follow_location(true)?;
        easy.max_redirections(self.opts.max_redirections)?;
        easy.connect_timeout(self.opts.connect_timeout)?;
        easy.low_speed_limit(self.opts.low_speed_limit)?;
        easy.low_speed_time(self.opts.low_speed_time)?;
        if let Some(timeout) = timeout {
            easy.timeout(timeout)?;
        }
        match request.method {
            Method::Head => easy.nobody(true)?,
            Method::Get => easy.get(true)?,
        }

        if !request.headers.is_empty() {
            let mut list = curl::easy::List::new();
            for (k, v) in &request.headers {
                list.append(&format!("{}: {}", k.trim(), v.trim()))?;
            }
            easy.http_headers(list)?;
        }

        let mut header_lines: Vec<String> = Vec::new();
        let mut body: Vec<u8> = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    let line = s.trim_end();
                    // A new status line starts the next hop of a redirect chain.
                    if line.starts_with("HTTP/") {
                        header_lines.clear();
                    }
                    header_lines.push(line.to_string());
                }
                true
            })?;
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let status = easy.response_code()?;
        Ok(Response {
            status,
            headers: split_header_lines(&header_lines),
            body,
        })
    }
}

/// Turns raw `Name: value` lines into pairs; the status line and blanks are dropped.
fn split_header_lines(lines: &[String]) -> Vec<(String, String)> {
    lines
        .iter()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with("HTTP/") {
                return None;
            }
            line.split_once(':')
                .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_header_lines_skips_status_and_blank_lines() {
        let lines = [
            "HTTP/1.1 200 OK".to_string(),
            "Content-Length: 12".to_string(),
            "X-Odd:  spaced value ".to_string(),
            "".to_string(),
        ];
        let pairs = split_header_lines(&lines);
        assert_eq!(
            pairs,
            vec![
                ("Content-Length".to_string(), "12".to_string()),
                ("X-Odd".to_string(), "spaced value".to_string()),
            ]
        );
    }

    #[test]
    fn expired_deadline_fails_before_any_io() {
        let transport = CurlTransport::default();
        let request = Request::get("http://127.0.0.1:9/never")
            .deadline(Some(Instant::now() - Duration::from_millis(1)));
        let err = transport.execute(&request).unwrap_err();
        assert!(matches!(err, TransportError::DeadlineExceeded));
    }
}
