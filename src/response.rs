//! Stored response representation.
//!
//! Responses move through the system in one shape: captured off the network,
//! written into a cache store, and replayed to clients. The type is plainly
//! cloneable so a single fetched response can be handed to the requester while
//! an identical copy goes into the cache.

/// Connection-scoped headers that describe one hop, not the payload. They are
/// dropped at capture time; content-length is dropped too because the body is
/// re-framed on replay.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
];

/// A response in storable form: status code, header list, and full body bytes.
///
/// Cloning yields a fully independent copy. Header order is preserved from
/// capture; duplicate header names are kept as separate pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CachedResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Build a response captured from the network, dropping connection-scoped
    /// headers that must not be replayed from a cache.
    pub fn captured(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        let headers = headers
            .into_iter()
            .filter(|(name, _)| !HOP_BY_HOP_HEADERS.contains(&name.to_ascii_lowercase().as_str()))
            .collect();
        Self {
            status,
            headers,
            body,
        }
    }

    /// Whether the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Look up the first header with the given name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html_headers() -> Vec<(String, String)> {
        vec![
            ("Content-Type".to_string(), "text/html".to_string()),
            ("Connection".to_string(), "keep-alive".to_string()),
            ("Transfer-Encoding".to_string(), "chunked".to_string()),
            ("Content-Length".to_string(), "1234".to_string()),
        ]
    }

    #[test]
    fn captured_drops_connection_scoped_headers() {
        let response = CachedResponse::captured(200, html_headers(), b"<html>".to_vec());

        assert_eq!(
            response.headers,
            vec![("Content-Type".to_string(), "text/html".to_string())]
        );
    }

    #[test]
    fn new_stores_headers_verbatim() {
        let response = CachedResponse::new(200, html_headers(), Vec::new());

        assert_eq!(response.headers.len(), 4);
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let response = CachedResponse::captured(200, html_headers(), Vec::new());

        assert_eq!(response.header("content-type"), Some("text/html"));
        assert_eq!(response.header("CONTENT-TYPE"), Some("text/html"));
        assert_eq!(response.header("x-missing"), None);
    }

    #[test]
    fn success_covers_exactly_the_2xx_range() {
        let cases = [
            (199, false),
            (200, true),
            (204, true),
            (299, true),
            (300, false),
            (404, false),
            (500, false),
        ];
        for (status, success) in cases {
            let response = CachedResponse::new(status, Vec::new(), Vec::new());
            assert_eq!(response.is_success(), success, "status {status}");
        }
    }

    #[test]
    fn clone_is_independent() {
        let original = CachedResponse::new(200, Vec::new(), b"first".to_vec());
        let mut copy = original.clone();
        copy.body = b"second".to_vec();

        assert_eq!(original.body, b"first");
        assert_eq!(copy.body, b"second");
    }
}
