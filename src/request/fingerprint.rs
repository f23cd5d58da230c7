use crate::request::Request;
use sha2::{Digest, Sha256};
use url::Url;

/// Canonicalizes a URL for fingerprinting
///
/// # Canonicalization Steps
///
/// 1. Parse the URL; unparseable input is returned unchanged
/// 2. Lowercase the host (done by the parser)
/// 3. Empty path becomes /
/// 4. Remove fragment (everything after #)
/// 5. Sort query parameters by key, then value, keeping blank values
/// 6. Remove empty query string (trailing ?)
///
/// The scheme is kept as is: `http` and `https` variants of a URL are
/// different requests.
///
/// # Examples
///
/// ```
/// use sumi_frontier::request::canonicalize_url;
///
/// let url = canonicalize_url("https://EXAMPLE.com/page?b=2&a=1#top");
/// assert_eq!(url, "https://example.com/page?a=1&b=2");
/// ```
pub fn canonicalize_url(url_str: &str) -> String {
    let mut url = match Url::parse(url_str) {
        Ok(url) => url,
        Err(_) => return url_str.to_string(),
    };

    url.set_fragment(None);

    if url.query().is_some() {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        params.sort();

        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    url.to_string()
}

/// Computes the fingerprint of a request
///
/// The fingerprint is a hex-encoded SHA-256 digest over the uppercased method,
/// the canonical URL and the body. Requests with equal fingerprints count as
/// the same request for duplicate filtering.
pub fn request_fingerprint(request: &Request) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request.method.to_ascii_uppercase().as_bytes());
    hasher.update([0u8]);
    hasher.update(canonicalize_url(&request.url).as_bytes());
    hasher.update([0u8]);
    hasher.update(&request.body);
    hex::encode(hasher.finalize())
}
