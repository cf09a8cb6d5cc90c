//! Normalized HTTP response.
//!
//! Every backend translates whatever its I/O mechanism produced into this
//! one shape, so callers never see which backend served a request. Fields are
//! private: a `Response` is built once by a transport and only read after.

use std::borrow::Cow;

use http::HeaderMap;

/// Status code, headers, and fully buffered body of a completed exchange.
///
/// `headers` is an `http::HeaderMap`: names are case-insensitive and a name
/// may carry several values.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    code: u16,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Response {
    pub fn new(code: u16, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
        Self {
            code,
            headers,
            body: body.into(),
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of `name`, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Every value of `name`, in the order received. Non-UTF-8 values are skipped.
    pub fn header_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn into_parts(self) -> (u16, HeaderMap, Vec<u8>) {
        (self.code, self.headers, self.body)
    }
}

#[cfg(test)]
mod tests {
    use http::header::{HeaderValue, CONTENT_TYPE, SET_COOKIE};

    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let resp = Response::new(200, headers, "ok");

        assert_eq!(resp.code(), 200);
        assert_eq!(resp.header("content-type"), Some("text/plain"));
        assert_eq!(resp.header("Content-Type"), Some("text/plain"));
        assert_eq!(resp.body(), b"ok");
        assert_eq!(resp.text(), "ok");
    }

    #[test]
    fn repeated_headers_keep_every_value() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));
        let resp = Response::new(204, headers, Vec::new());

        assert_eq!(resp.header("set-cookie"), Some("a=1"));
        assert_eq!(resp.header_all("set-cookie"), vec!["a=1", "b=2"]);
        assert!(resp.body().is_empty());
    }

    #[test]
    fn missing_header_is_none() {
        let resp = Response::new(404, HeaderMap::new(), "");
        assert_eq!(resp.header("x-missing"), None);
        assert!(resp.header_all("x-missing").is_empty());
    }

    #[test]
    fn equal_by_value() {
        let a = Response::new(200, HeaderMap::new(), "same");
        let b = Response::new(200, HeaderMap::new(), b"same".to_vec());
        assert_eq!(a, b);
        let (code, _, body) = b.into_parts();
        assert_eq!((code, body), (200, b"same".to_vec()));
    }
}
