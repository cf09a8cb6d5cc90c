//! Error types for transports and transport selection.
//!
//! # Design
//! Construction, per-request I/O, and response normalization fail in
//! different ways and callers react differently to each, so they get
//! separate types. `UnsupportedEnvironmentError` only ever comes out of a
//! constructor. `RequestError` is what `Transport::request` returns and is
//! either a `TransportError` (the exchange did not complete) or a
//! `ResponseDecodingError` (it completed but could not be normalized).
//! `TransportErrorKind` lets callers tell a timeout from a refused
//! connection without inspecting message strings.

use std::fmt;

use crate::select::TransportKind;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The runtime lacks the capability a transport depends on.
#[derive(Debug, thiserror::Error)]
#[error("the {transport} transport is not supported in this environment")]
pub struct UnsupportedEnvironmentError {
    pub transport: &'static str,
}

/// Coarse classification of a failed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The deadline elapsed before the response was complete.
    Timeout,
    /// The peer could not be reached (refused, reset, unreachable).
    Connect,
    /// The host name did not resolve.
    Dns,
    /// Reading or writing the connection failed after it was established.
    Io,
    /// The request could not be expressed on the wire (bad header, bad URI).
    InvalidRequest,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportErrorKind::Timeout => "timed out",
            TransportErrorKind::Connect => "connection failed",
            TransportErrorKind::Dns => "name resolution failed",
            TransportErrorKind::Io => "i/o error",
            TransportErrorKind::InvalidRequest => "invalid request",
            TransportErrorKind::Other => "transport error",
        };
        f.write_str(s)
    }
}

/// The network exchange failed. Carries the underlying cause, if any.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: TransportErrorKind,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == TransportErrorKind::Timeout
    }
}

/// The backend produced something that could not be turned into a `Response`.
#[derive(Debug, thiserror::Error)]
#[error("could not decode response: {reason}")]
pub struct ResponseDecodingError {
    reason: String,
    #[source]
    source: Option<BoxError>,
}

impl ResponseDecodingError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            source: None,
        }
    }

    pub fn with_source(reason: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            reason: reason.into(),
            source: Some(source.into()),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Everything `Transport::request` can fail with.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decoding(#[from] ResponseDecodingError),
}

impl RequestError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RequestError::Transport(e) if e.is_timeout())
    }

    /// The transport-level kind, or `None` for decoding failures.
    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            RequestError::Transport(e) => Some(e.kind()),
            RequestError::Decoding(_) => None,
        }
    }
}

/// None of the preferred transports can run here.
#[derive(Debug, thiserror::Error)]
#[error("no supported transport among {tried:?}")]
pub struct NoTransportAvailable {
    pub tried: Vec<TransportKind>,
}

/// A transport configuration document could not be read.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid transport config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    NoTransport(#[from] NoTransportAvailable),
}
