//! Hop-by-hop header handling.
//!
//! Everything not in the fixed list below is end-to-end and must reach the
//! upstream (or caller) with its exact value. `host` and `content-length`
//! are recomputed for the outbound request.

use axum::http::header::HeaderName;
use axum::http::HeaderMap;

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "proxy-connection",
    "keep-alive",
    "transfer-encoding",
    "te",
    "trailer",
    "upgrade",
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.iter().any(|h| name.as_str() == *h)
}

/// Copy the end-to-end request headers for forwarding. `host` and
/// `content-length` are dropped here and recomputed from the outbound URL
/// and body.
pub fn end_to_end_request_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if is_hop_by_hop(name) || name == "host" || name == "content-length" {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Strip connection-level response headers; the body is re-framed by the
/// server, so the upstream's framing headers must not leak through.
pub fn sanitize_response_headers(mut headers: HeaderMap) -> HeaderMap {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
    headers.remove("content-length");
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn request_copy_keeps_custom_headers_exactly() {
        let mut headers = HeaderMap::new();
        headers.insert("x-custom", HeaderValue::from_static("v"));
        headers.insert("authorization", HeaderValue::from_static("Bearer t0ken"));
        headers.insert("host", HeaderValue::from_static("gateway.internal"));
        headers.insert("connection", HeaderValue::from_static("keep-alive"));
        headers.insert("content-length", HeaderValue::from_static("42"));

        let out = end_to_end_request_headers(&headers);
        assert_eq!(out.get("x-custom").unwrap(), "v");
        assert_eq!(out.get("authorization").unwrap(), "Bearer t0ken");
        assert!(out.get("host").is_none());
        assert!(out.get("connection").is_none());
        assert!(out.get("content-length").is_none());
    }

    #[test]
    fn request_copy_preserves_repeated_headers() {
        let mut headers = HeaderMap::new();
        headers.append("x-tag", HeaderValue::from_static("a"));
        headers.append("x-tag", HeaderValue::from_static("b"));

        let out = end_to_end_request_headers(&headers);
        let values: Vec<_> = out.get_all("x-tag").iter().collect();
        assert_eq!(values, ["a", "b"]);
    }

    #[test]
    fn response_sanitize_drops_framing_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        headers.insert("connection", HeaderValue::from_static("close"));

        let out = sanitize_response_headers(headers);
        assert_eq!(out.get("content-type").unwrap(), "application/json");
        assert!(out.get("transfer-encoding").is_none());
        assert!(out.get("connection").is_none());
    }
}
