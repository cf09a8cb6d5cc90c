//! In-memory transport for tests.
//!
//! `MockTransport` runs the same option merge as the network backends, logs
//! the result as a `RecordedRequest`, and hands the request to a responder
//! closure instead of the network. Tests assert on the log to check what a
//! real backend would have sent.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use http::HeaderMap;
use url::Url;

use super::encode_body;
use crate::error::RequestError;
use crate::options::{effective_options, TransportOptions};
use crate::request::HttpRequest;
use crate::response::Response;
use crate::transport::{Backend, Transport};

/// What the mock saw for one call, after overrides were applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub uri: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    pub timeout: Option<Duration>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

type Responder = dyn Fn(&RecordedRequest) -> Result<Response, RequestError> + Send + Sync;

pub struct MockTransport {
    options: TransportOptions,
    responder: Arc<Responder>,
    log: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    /// Replace the default `200`, empty-body answer.
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> Result<Response, RequestError> + Send + Sync + 'static,
    {
        self.responder = Arc::new(responder);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.log().clone()
    }

    pub fn request_count(&self) -> usize {
        self.log().len()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.log().last().cloned()
    }

    fn log(&self) -> MutexGuard<'_, Vec<RecordedRequest>> {
        // A panicking responder poisons nothing we care about.
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("options", &self.options)
            .field("requests", &self.request_count())
            .finish_non_exhaustive()
    }
}

impl Transport for MockTransport {
    fn request(&self, request: &HttpRequest) -> Result<Response, RequestError> {
        let mut eff = effective_options(&self.options, request)?;
        let body = encode_body(request, &mut eff.headers);
        let recorded = RecordedRequest {
            method: request.method.clone(),
            uri: request.uri.clone(),
            headers: eff.headers,
            body,
            timeout: eff.timeout,
        };
        tracing::debug!(
            transport = Self::NAME,
            method = %recorded.method,
            uri = %recorded.uri,
            "mock request"
        );

        self.log().push(recorded.clone());
        (self.responder)(&recorded)
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

impl Backend for MockTransport {
    const NAME: &'static str = "mock";

    fn is_supported() -> bool {
        true
    }

    fn from_options(options: TransportOptions) -> Self {
        Self {
            options,
            responder: Arc::new(empty_ok),
            log: Mutex::new(Vec::new()),
        }
    }

    fn options(&self) -> &TransportOptions {
        &self.options
    }
}

fn empty_ok(_: &RecordedRequest) -> Result<Response, RequestError> {
    Ok(Response::new(200, HeaderMap::new(), Vec::new()))
}
