//! Parse HTTP response headers into HeadResult.

use super::HeadResult;

/// Parse response header pairs into HeadResult. Names match case-insensitively;
/// a repeated header keeps its last value.
pub(crate) fn parse_headers(headers: &[(String, String)]) -> HeadResult {
    let mut head = HeadResult::default();

    for (name, value) in headers {
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            head.content_length = value.parse::<u64>().ok();
        } else if name.eq_ignore_ascii_case("accept-ranges") {
            head.accept_ranges = value
                .split(',')
                .any(|unit| unit.trim().eq_ignore_ascii_case("bytes"));
        } else if name.eq_ignore_ascii_case("content-type") {
            head.content_type = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("etag") {
            head.etag = Some(value.trim_matches('"').to_string());
        } else if name.eq_ignore_ascii_case("last-modified") {
            head.last_modified = Some(value.to_string());
        }
    }

    head
}
