//! Concrete transports.
//!
//! - `socket`: HTTP/1.0 over `std::net::TcpStream`, written by hand.
//! - `ureq_client`: delegates to the `ureq` client (feature `ureq`).
//! - `mock`: answers in memory and records what it was asked.

pub mod mock;
pub mod socket;
#[cfg(feature = "ureq")]
pub mod ureq_client;

use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

use crate::request::HttpRequest;

/// Name of the `ureq` backend, known even when the feature is off.
pub(crate) const UREQ_NAME: &str = "ureq";

/// Encode the request body, adding the implied `Content-Type` unless the
/// caller already chose one.
pub(crate) fn encode_body(request: &HttpRequest, headers: &mut HeaderMap) -> Option<Vec<u8>> {
    let (content_type, bytes) = request.data.as_ref()?.encode();
    if let Some(ct) = content_type {
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        }
    }
    Some(bytes)
}
