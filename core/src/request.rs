//! Request-side value types.
//!
//! # Design
//! An `HttpRequest` is plain data describing one call: method, URI, optional
//! body, per-call headers, and the two per-call overrides (timeout and user
//! agent). Transports only ever borrow it, so the same value can be sent
//! through several backends and nothing a transport does can leak into the
//! next call.

use std::time::Duration;

use url::Url;

/// Request payload: structured form fields or raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Form(Vec<(String, String)>),
    Raw(Vec<u8>),
}

impl RequestBody {
    pub fn form<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        RequestBody::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        RequestBody::Raw(bytes.into())
    }

    /// Wire bytes plus the content type they imply, if any.
    ///
    /// Form fields are `application/x-www-form-urlencoded`; raw payloads
    /// carry no implied type.
    pub fn encode(&self) -> (Option<&'static str>, Vec<u8>) {
        match self {
            RequestBody::Form(fields) => {
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(fields.iter())
                    .finish();
                (
                    Some("application/x-www-form-urlencoded"),
                    encoded.into_bytes(),
                )
            }
            RequestBody::Raw(bytes) => (None, bytes.clone()),
        }
    }
}

impl From<String> for RequestBody {
    fn from(s: String) -> Self {
        RequestBody::Raw(s.into_bytes())
    }
}

impl From<&str> for RequestBody {
    fn from(s: &str) -> Self {
        RequestBody::Raw(s.as_bytes().to_vec())
    }
}

/// One HTTP call, described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Passed through verbatim; case matters.
    pub method: String,
    pub uri: Url,
    pub data: Option<RequestBody>,
    pub headers: Vec<(String, String)>,
    /// Overrides the configured default for this call only.
    pub timeout: Option<Duration>,
    /// Overrides the configured default for this call only.
    pub user_agent: Option<String>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, uri: Url) -> Self {
        Self {
            method: method.into(),
            uri,
            data: None,
            headers: Vec::new(),
            timeout: None,
            user_agent: None,
        }
    }

    pub fn get(uri: Url) -> Self {
        Self::new("GET", uri)
    }

    pub fn post(uri: Url, data: impl Into<RequestBody>) -> Self {
        Self::new("POST", uri).with_data(data)
    }

    pub fn with_data(mut self, data: impl Into<RequestBody>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Path plus query, as it goes on the request line.
    pub fn target(&self) -> String {
        match self.uri.query() {
            Some(q) => format!("{}?{q}", self.uri.path()),
            None => self.uri.path().to_string(),
        }
    }
}
