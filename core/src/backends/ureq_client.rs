//! Library-backed transport delegating to `ureq`.
//!
//! Each call builds a fresh agent from the merged options, so a per-call
//! timeout is baked into that call's agent and nothing is shared between
//! calls. Status codes are never turned into errors and the method string is
//! handed to `ureq` untouched. Redirects are not followed, so a 3xx comes
//! back as the response; TLS is whatever `ureq` does by default.

use std::io;
use std::time::Instant;

use http::HeaderMap;

use super::{encode_body, UREQ_NAME};
use crate::error::{RequestError, ResponseDecodingError, TransportError, TransportErrorKind};
use crate::options::{effective_options, TransportOptions};
use crate::request::HttpRequest;
use crate::response::Response;
use crate::transport::{Backend, Transport};

#[derive(Debug, Clone)]
pub struct UreqTransport {
    options: TransportOptions,
}

impl Transport for UreqTransport {
    fn request(&self, request: &HttpRequest) -> Result<Response, RequestError> {
        let started = Instant::now();
        let mut eff = effective_options(&self.options, request)?;
        let body = encode_body(request, &mut eff.headers);

        let method = http::Method::from_bytes(request.method.as_bytes()).map_err(|e| {
            TransportError::with_source(
                TransportErrorKind::InvalidRequest,
                format!("invalid method {:?}", request.method),
                e,
            )
        })?;
        let uri: http::Uri = request.uri.as_str().parse().map_err(|e| {
            TransportError::with_source(
                TransportErrorKind::InvalidRequest,
                request.uri.to_string(),
                e,
            )
        })?;

        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .allow_non_standard_methods(true)
            .max_redirects(0)
            .timeout_global(eff.timeout)
            .build()
            .new_agent();

        tracing::debug!(
            transport = Self::NAME,
            method = %request.method,
            uri = %request.uri,
            timeout = ?eff.timeout,
            "sending request"
        );

        let result = match body {
            Some(bytes) => agent.run(build(method, uri, eff.headers, bytes)),
            None => agent.run(build(method, uri, eff.headers, ())),
        };
        let response = result.map_err(classify)?;

        let (parts, mut body) = response.into_parts();
        let bytes = body
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(classify)?;

        tracing::debug!(
            transport = Self::NAME,
            status = parts.status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "response received"
        );
        Ok(Response::new(parts.status.as_u16(), parts.headers, bytes))
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

impl Backend for UreqTransport {
    const NAME: &'static str = UREQ_NAME;

    fn is_supported() -> bool {
        true
    }

    fn from_options(options: TransportOptions) -> Self {
        Self { options }
    }

    fn options(&self) -> &TransportOptions {
        &self.options
    }
}

fn build<B>(
    method: http::Method,
    uri: http::Uri,
    headers: HeaderMap,
    body: B,
) -> http::Request<B> {
    let mut req = http::Request::new(body);
    *req.method_mut() = method;
    *req.uri_mut() = uri;
    *req.headers_mut() = headers;
    req
}

/// Sort a `ureq` failure into transport vs decoding errors.
fn classify(e: ureq::Error) -> RequestError {
    let decoding = match &e {
        ureq::Error::Protocol(p) => is_response_side(p),
        ureq::Error::BodyExceedsLimit(_) => true,
        _ => false,
    };
    if decoding {
        return ResponseDecodingError::with_source("ureq could not read the response", e).into();
    }
    let kind = match &e {
        ureq::Error::Timeout(_) => TransportErrorKind::Timeout,
        ureq::Error::HostNotFound => TransportErrorKind::Dns,
        ureq::Error::ConnectionFailed => TransportErrorKind::Connect,
        ureq::Error::Io(err) => io_kind(err),
        ureq::Error::Protocol(_) | ureq::Error::BadUri(_) | ureq::Error::Http(_) => {
            TransportErrorKind::InvalidRequest
        }
        _ => TransportErrorKind::Other,
    };
    let message = e.to_string();
    TransportError::with_source(kind, message, e).into()
}

/// Protocol errors raised while reading what the server sent. Everything
/// else is about the request we tried to write.
fn is_response_side(e: &ureq_proto::Error) -> bool {
    use ureq_proto::Error as P;
    matches!(
        e,
        P::ChunkLenNotAscii
            | P::ChunkLenNotANumber
            | P::ChunkExpectedCrLf
            | P::HttpParseFail(_)
            | P::HttpParseTooManyHeaders
            | P::HeadersWith100
            | P::NoLocationHeader
            | P::BadLocationHeader(_)
            | P::UnsupportedVersion
    )
}

fn io_kind(e: &io::Error) -> TransportErrorKind {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportErrorKind::Timeout,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected => TransportErrorKind::Connect,
        _ => TransportErrorKind::Io,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_keeps_everything() {
        let mut headers = HeaderMap::new();
        headers.insert("x-one", "1".parse().unwrap());
        let method = http::Method::from_bytes(b"PURGE").unwrap();
        let req = build(method, "http://localhost/x".parse().unwrap(), headers, "body");
        assert_eq!(req.method().as_str(), "PURGE");
        assert_eq!(req.uri(), "http://localhost/x");
        assert_eq!(req.headers().get("x-one").unwrap(), "1");
        assert_eq!(*req.body(), "body");
    }

    #[test]
    fn classifies_errors() {
        assert_eq!(
            classify(ureq::Error::HostNotFound).transport_kind(),
            Some(TransportErrorKind::Dns)
        );
        assert_eq!(
            classify(ureq::Error::ConnectionFailed).transport_kind(),
            Some(TransportErrorKind::Connect)
        );
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(
            classify(ureq::Error::Io(refused)).transport_kind(),
            Some(TransportErrorKind::Connect)
        );
        let timed_out = io::Error::new(io::ErrorKind::TimedOut, "slow");
        assert!(classify(ureq::Error::Io(timed_out)).is_timeout());
        assert!(matches!(
            classify(ureq::Error::BodyExceedsLimit(10)),
            RequestError::Decoding(_)
        ));
    }

    #[test]
    fn protocol_errors_split_by_side() {
        use ureq_proto::Error as P;

        for reply in [
            P::HttpParseFail("bad status".to_string()),
            P::ChunkLenNotANumber,
            P::ChunkExpectedCrLf,
            P::HttpParseTooManyHeaders,
        ] {
            let err = classify(ureq::Error::Protocol(reply));
            assert!(matches!(err, RequestError::Decoding(_)), "{err}");
        }

        for sent in [
            P::BadHeader("x".to_string()),
            P::TooManyHostHeaders,
            P::BadContentLengthHeader,
            P::BodyNotAllowed,
            P::BodyLargerThanContentLength,
        ] {
            let err = classify(ureq::Error::Protocol(sent));
            assert_eq!(
                err.transport_kind(),
                Some(TransportErrorKind::InvalidRequest),
                "{err}"
            );
        }
    }

    #[test]
    fn always_supported_when_compiled() {
        assert!(UreqTransport::is_supported());
        assert!(UreqTransport::new(TransportOptions::new()).is_ok());
    }
}
