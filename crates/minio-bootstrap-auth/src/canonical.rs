//! Canonical request construction for AWS Signature Version 4.
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
//! On the signing side we control the request URL, so query strings are
//! produced by [`encode_query`] and the same encoded string is both sent on
//! the wire and fed into the canonical form.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters left unencoded by SigV4: `A-Z a-z 0-9 - _ . ~`.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Build the full canonical request string from its components.
///
/// # Examples
///
/// ```
/// use minio_bootstrap_auth::canonical::build_canonical_request;
///
/// let canonical = build_canonical_request(
///     "GET",
///     "/minio/admin/v3/info",
///     "",
///     &[("host", "minio:9000")],
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
/// );
/// assert!(canonical.starts_with("GET\n/minio/admin/v3/info\n\nhost:minio:9000\n"));
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    path: &str,
    query: &str,
    headers: &[(&str, &str)],
    payload_hash: &str,
) -> String {
    let canonical_headers = CanonicalHeaders::new(headers);

    format!(
        "{method}\n{uri}\n{query}\n{headers}\n\n{signed}\n{payload_hash}",
        uri = build_canonical_uri(path),
        query = build_canonical_query_string(query),
        headers = canonical_headers.render(),
        signed = canonical_headers.signed_names(),
    )
}

/// Normalized, lowercased, sorted header set that takes part in a signature.
#[derive(Debug, Clone, Default)]
pub struct CanonicalHeaders {
    entries: BTreeMap<String, String>,
}

impl CanonicalHeaders {
    /// Normalize the given header pairs.
    ///
    /// Names are lowercased, values trimmed with inner whitespace runs
    /// collapsed to one space. Repeated names are joined with commas.
    #[must_use]
    pub fn new(headers: &[(&str, &str)]) -> Self {
        let mut entries: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in headers {
            let value = collapse_whitespace(value.trim());
            entries
                .entry(name.to_ascii_lowercase())
                .and_modify(|existing| {
                    existing.push(',');
                    existing.push_str(&value);
                })
                .or_insert(value);
        }
        Self { entries }
    }

    /// `name:value` lines joined by `\n`, without a trailing newline.
    #[must_use]
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| format!("{name}:{value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The `SignedHeaders` value: sorted names joined by `;`.
    #[must_use]
    pub fn signed_names(&self) -> String {
        self.entries.keys().map(String::as_str).collect::<Vec<_>>().join(";")
    }
}

/// Build the canonical URI by URI-encoding each path segment individually.
///
/// # Examples
///
/// ```
/// use minio_bootstrap_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri("/minio/admin/v3/add-user"), "/minio/admin/v3/add-user");
/// assert_eq!(build_canonical_uri(""), "/");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| uri_encode(&percent_decode_str(segment).decode_utf8_lossy()))
        .collect::<Vec<_>>()
        .join("/")
}

/// Sort an already-encoded query string into canonical order.
///
/// # Examples
///
/// ```
/// use minio_bootstrap_auth::canonical::build_canonical_query_string;
///
/// assert_eq!(build_canonical_query_string("name=p&a=1"), "a=1&name=p");
/// ```
#[must_use]
pub fn build_canonical_query_string(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut params: Vec<(&str, &str)> = query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|param| param.split_once('=').unwrap_or((param, "")))
        .collect();
    params.sort_unstable();

    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Encode query parameters with the SigV4 encoding rules.
///
/// The output is suitable both for the request URL and for
/// [`build_canonical_query_string`].
///
/// # Examples
///
/// ```
/// use minio_bootstrap_auth::canonical::encode_query;
///
/// assert_eq!(encode_query(&[("accessKey", "app user")]), "accessKey=app%20user");
/// ```
#[must_use]
pub fn encode_query(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}

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
