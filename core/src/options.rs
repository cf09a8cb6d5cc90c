//! Construction-time defaults and the per-call merge.
//!
//! # Design
//! A transport keeps one `TransportOptions` snapshot for its whole life and
//! never writes to it. Each call computes a fresh `EffectiveOptions` with
//! `effective_options`, a pure function of the snapshot and the request, so
//! overrides from one call cannot survive into the next one and concurrent
//! calls share nothing mutable.
//!
//! Header precedence, lowest to highest: option headers, option user agent,
//! request headers, request user agent. A higher layer replaces every value
//! of the same (case-insensitive) name.

use std::collections::BTreeMap;
use std::time::Duration;

use http::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};

use crate::error::{TransportError, TransportErrorKind};
use crate::request::HttpRequest;

/// Defaults a transport applies to every request it sends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportOptions {
    pub headers: BTreeMap<String, String>,
    /// Whole-request deadline. Written as integer seconds in config files.
    #[serde(with = "secs", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl TransportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
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
}

/// What one call actually runs with after overrides are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveOptions {
    pub headers: HeaderMap,
    pub timeout: Option<Duration>,
}

/// Merge the transport's defaults with one request's overrides.
///
/// A zero timeout or an empty user agent on the request counts as absent.
pub fn effective_options(
    config: &TransportOptions,
    request: &HttpRequest,
) -> Result<EffectiveOptions, TransportError> {
    let mut headers = HeaderMap::new();

    for (name, value) in &config.headers {
        headers.insert(header_name(name)?, header_value(name, value)?);
    }
    if let Some(ua) = config.user_agent.as_deref().filter(|ua| !ua.is_empty()) {
        headers.insert(USER_AGENT, header_value("user-agent", ua)?);
    }

    // Request headers replace defaults by name, but repeats within the
    // request itself are all kept.
    let mut overridden = Vec::new();
    for (name, value) in &request.headers {
        let name_key = header_name(name)?;
        let value = header_value(name, value)?;
        if !overridden.contains(&name_key) {
            headers.remove(&name_key);
            overridden.push(name_key.clone());
        }
        headers.append(name_key, value);
    }
    if let Some(ua) = request.user_agent.as_deref().filter(|ua| !ua.is_empty()) {
        headers.insert(USER_AGENT, header_value("user-agent", ua)?);
    }

    let timeout = request
        .timeout
        .filter(|t| !t.is_zero())
        .or(config.timeout);

    Ok(EffectiveOptions { headers, timeout })
}

fn header_name(name: &str) -> Result<HeaderName, TransportError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
        TransportError::with_source(
            TransportErrorKind::InvalidRequest,
            format!("invalid header name {name:?}"),
            e,
        )
    })
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, TransportError> {
    HeaderValue::from_str(value).map_err(|e| {
        TransportError::with_source(
            TransportErrorKind::InvalidRequest,
            format!("invalid value for header {name:?}"),
            e,
        )
    })
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}
