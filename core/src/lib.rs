//! Pluggable HTTP transports behind one blocking contract.
//!
//! # Overview
//! A caller describes a call as an `HttpRequest`, hands it to any
//! `Transport`, and gets back a normalized `Response` (status code, headers,
//! body) no matter which backend did the I/O.
//!
//! # Design
//! - `Transport` is object safe; `select_transport` returns a
//!   `Box<dyn Transport>` chosen by preference order and each backend's
//!   `Backend::is_supported` probe.
//! - A transport keeps an immutable `TransportOptions` snapshot. Per-call
//!   overrides are merged by the pure `effective_options`, so nothing from
//!   one call survives into the next.
//! - Failures are split three ways: `UnsupportedEnvironmentError` at
//!   construction, `TransportError` and `ResponseDecodingError` per request.
//! - One attempt per call; retries, pooling, and redirects policy belong to
//!   the caller or the wrapped library.

pub mod backends;
pub mod config;
pub mod error;
pub mod options;
pub mod request;
pub mod response;
pub mod select;
pub mod transport;

pub use backends::mock::{MockTransport, RecordedRequest};
pub use backends::socket::SocketTransport;
#[cfg(feature = "ureq")]
pub use backends::ureq_client::UreqTransport;
pub use config::TransportConfig;
pub use error::{
    ConfigError, NoTransportAvailable, RequestError, ResponseDecodingError, TransportError,
    TransportErrorKind, UnsupportedEnvironmentError,
};
pub use options::{effective_options, EffectiveOptions, TransportOptions};
pub use request::{HttpRequest, RequestBody};
pub use response::Response;
pub use select::{select_transport, TransportKind, DEFAULT_PREFERENCE};
pub use transport::{Backend, Transport};
