//! Canonical request construction.
//!
//! The canonical request is the normalized textual form both sides hash and
//! sign:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! Ordering and encoding rules:
//!
//! - The URI is split on `/` with empty segments preserved; each segment is
//!   percent-decoded then re-encoded against the AWS unreserved set
//!   (`A-Za-z0-9-_.~`), so an already-encoded path and its raw form
//!   canonicalize identically. An empty path becomes `/`.
//! - The query string is taken as already percent-encoded, split on `&`,
//!   and stably sorted by encoded parameter name; duplicate names keep
//!   their relative order.
//! - Header names are lowercased; values are trimmed with interior runs of
//!   whitespace collapsed; entries are sorted by name.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters that must be percent-encoded in URI path segments: everything
/// outside the AWS unreserved set.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Build the full canonical request string.
#[must_use]
pub fn build_canonical_request(
    method: &str,
    path: &str,
    query: &str,
    headers: &[(String, String)],
    signed_headers: &[String],
    payload_hash: &str,
) -> String {
    let canonical_uri = canonical_uri(path);
    let canonical_query = canonical_query_string(query);
    let canonical_headers = canonical_headers_block(headers, signed_headers);
    let signed = signed_headers_string(signed_headers);

    format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n\n{signed}\n{payload_hash}"
    )
}

/// Canonicalize a URI path by re-encoding each segment.
///
/// Empty segments are preserved (a double slash stays a double slash) and
/// an empty path normalizes to `/`.
#[must_use]
pub fn canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| {
            // Decode first so raw and pre-encoded inputs canonicalize the
            // same way, then re-encode against the unreserved set.
            let decoded = percent_decode_str(segment).decode_utf8_lossy();
            utf8_percent_encode(&decoded, URI_ENCODE_SET).to_string()
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Canonicalize an already-percent-encoded query string.
///
/// Parameters are stably sorted by encoded name; values are preserved
/// byte-for-byte (the server must canonicalize exactly what the client
/// signed, whatever encoding the client chose). Empty input stays empty.
#[must_use]
pub fn canonical_query_string(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut params: Vec<(&str, &str)> = query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|param| param.split_once('=').unwrap_or((param, "")))
        .collect();

    // Stable sort on the encoded name only: duplicate names keep their
    // relative order.
    params.sort_by(|a, b| a.0.cmp(b.0));

    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical headers block for the signed headers, sorted by
/// lowercased name. No trailing newline; the caller supplies the blank
/// separator line.
#[must_use]
pub fn canonical_headers_block(headers: &[(String, String)], signed_headers: &[String]) -> String {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let lower = name.to_lowercase();
        let trimmed = collapse_whitespace(value.trim());
        map.entry(lower)
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&trimmed);
            })
            .or_insert(trimmed);
    }

    let mut sorted: Vec<&String> = signed_headers.iter().collect();
    sorted.sort_unstable();

    sorted
        .iter()
        .filter_map(|name| map.get(name.as_str()).map(|value| format!("{name}:{value}")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The `SignedHeaders` value: lowercased names, sorted, joined with `;`.
#[must_use]
pub fn signed_headers_string(signed_headers: &[String]) -> String {
    let mut sorted: Vec<&str> = signed_headers.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.join(";")
}

/// Collapse interior whitespace runs to a single space.
fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}
