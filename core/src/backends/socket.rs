//! Stream-based transport: HTTP/1.0 over a plain `TcpStream`.
//!
//! # Design
//! The request goes out as HTTP/1.0 with `Connection: close`, so the server
//! delimits the response by closing the connection and the reader only has
//! to collect bytes until EOF (or until `Content-Length` / the last chunk
//! says the response is complete). One connection per call, no reuse.
//!
//! The timeout is a single deadline for the whole exchange: every connect,
//! write, and read gets whatever is left of it.
//!
//! Only `http` URIs are accepted; there is no TLS here.

use std::io::{self, Read, Write};
use std::net::{IpAddr, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use http::header::{
    HeaderMap, HeaderName, HeaderValue, CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING,
};
use http::StatusCode;
use url::{Host, Url};

use super::encode_body;
use crate::error::{RequestError, ResponseDecodingError, TransportError, TransportErrorKind};
use crate::options::{effective_options, TransportOptions};
use crate::request::HttpRequest;
use crate::response::Response;
use crate::transport::{Backend, Transport};

const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Clone)]
pub struct SocketTransport {
    options: TransportOptions,
}

impl Transport for SocketTransport {
    fn request(&self, request: &HttpRequest) -> Result<Response, RequestError> {
        let started = Instant::now();
        let mut eff = effective_options(&self.options, request)?;
        let body = encode_body(request, &mut eff.headers);
        let deadline = Deadline::new(started, eff.timeout);

        let addrs = resolve(&request.uri)?;
        tracing::debug!(
            transport = Self::NAME,
            method = %request.method,
            uri = %request.uri,
            timeout = ?eff.timeout,
            "sending request"
        );

        let mut stream = connect(&addrs, &deadline)?;
        let head = request_head(request, eff.headers, body.as_deref());
        send(&mut stream, &head, body.as_deref(), &deadline)?;
        let raw = receive(&mut stream, &request.method, &deadline)?;

        let response = parse_response(&raw, &request.method)?;
        tracing::debug!(
            transport = Self::NAME,
            status = response.code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "response received"
        );
        Ok(response)
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

impl Backend for SocketTransport {
    const NAME: &'static str = "socket";

    fn is_supported() -> bool {
        cfg!(not(target_family = "wasm"))
    }

    fn from_options(options: TransportOptions) -> Self {
        Self { options }
    }

    fn options(&self) -> &TransportOptions {
        &self.options
    }
}

struct Deadline {
    at: Option<Instant>,
    timeout: Option<Duration>,
}

impl Deadline {
    fn new(started: Instant, timeout: Option<Duration>) -> Self {
        Self {
            at: timeout.map(|t| started + t),
            timeout,
        }
    }

    /// Time left, or a timeout error once it is gone. `None` means unbounded.
    fn remaining(&self) -> Result<Option<Duration>, TransportError> {
        let Some(at) = self.at else {
            return Ok(None);
        };
        match at.checked_duration_since(Instant::now()) {
            Some(left) if !left.is_zero() => Ok(Some(left)),
            _ => Err(self.expired()),
        }
    }

    fn expired(&self) -> TransportError {
        let secs = self.timeout.unwrap_or_default().as_secs_f64();
        TransportError::new(
            TransportErrorKind::Timeout,
            format!("no complete response within {secs}s"),
        )
    }
}

fn resolve(uri: &Url) -> Result<Vec<SocketAddr>, TransportError> {
    if uri.scheme() != "http" {
        return Err(TransportError::new(
            TransportErrorKind::InvalidRequest,
            format!("the socket transport only speaks http, not {}", uri.scheme()),
        ));
    }
    let port = uri.port_or_known_default().unwrap_or(80);
    match uri.host() {
        Some(Host::Ipv4(ip)) => Ok(vec![SocketAddr::new(IpAddr::V4(ip), port)]),
        Some(Host::Ipv6(ip)) => Ok(vec![SocketAddr::new(IpAddr::V6(ip), port)]),
        Some(Host::Domain(name)) => {
            let addrs: Vec<_> = (name, port)
                .to_socket_addrs()
                .map_err(|e| {
                    TransportError::with_source(TransportErrorKind::Dns, name.to_string(), e)
                })?
                .collect();
            if addrs.is_empty() {
                return Err(TransportError::new(
                    TransportErrorKind::Dns,
                    format!("{name} resolved to no addresses"),
                ));
            }
            Ok(addrs)
        }
        None => Err(TransportError::new(
            TransportErrorKind::InvalidRequest,
            format!("{uri} has no host"),
        )),
    }
}

fn connect(addrs: &[SocketAddr], deadline: &Deadline) -> Result<TcpStream, TransportError> {
    let mut last_err = None;
    for addr in addrs {
        let attempt = match deadline.remaining()? {
            Some(left) => TcpStream::connect_timeout(addr, left),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(e) if is_timeout(&e) => return Err(deadline.expired()),
            Err(e) => {
                tracing::debug!(%addr, error = %e, "connect failed");
                last_err = Some((addr, e));
            }
        }
    }
    Err(match last_err {
        Some((addr, e)) => {
            TransportError::with_source(TransportErrorKind::Connect, addr.to_string(), e)
        }
        None => TransportError::new(TransportErrorKind::Connect, "no address to connect to"),
    })
}

fn request_head(request: &HttpRequest, mut headers: HeaderMap, body: Option<&[u8]>) -> Vec<u8> {
    if !headers.contains_key(HOST) {
        let host = match (request.uri.host_str(), request.uri.port()) {
            (Some(h), Some(p)) => format!("{h}:{p}"),
            (Some(h), None) => h.to_string(),
            (None, _) => String::new(),
        };
        if let Ok(v) = HeaderValue::from_str(&host) {
            headers.insert(HOST, v);
        }
    }
    headers.insert(CONNECTION, HeaderValue::from_static("close"));
    headers.remove(TRANSFER_ENCODING);
    match body {
        Some(b) => {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(b.len()));
        }
        None => {
            headers.remove(CONTENT_LENGTH);
        }
    }

    let mut head = format!("{} {} HTTP/1.0\r\n", request.method, request.target()).into_bytes();
    for (name, value) in &headers {
        head.extend_from_slice(name.as_str().as_bytes());
        head.extend_from_slice(b": ");
        head.extend_from_slice(value.as_bytes());
        head.extend_from_slice(b"\r\n");
    }
    head.extend_from_slice(b"\r\n");
    head
}

fn send(
    stream: &mut TcpStream,
    head: &[u8],
    body: Option<&[u8]>,
    deadline: &Deadline,
) -> Result<(), TransportError> {
    for part in [Some(head), body].into_iter().flatten() {
        stream
            .set_write_timeout(deadline.remaining()?)
            .map_err(|e| io_error(e, "configuring socket", deadline))?;
        stream
            .write_all(part)
            .map_err(|e| io_error(e, "writing request", deadline))?;
    }
    stream.flush().map_err(|e| io_error(e, "writing request", deadline))
}

fn receive(
    stream: &mut TcpStream,
    method: &str,
    deadline: &Deadline,
) -> Result<Vec<u8>, TransportError> {
    let mut raw = Vec::new();
    let mut buf = [0u8; READ_CHUNK];
    loop {
        stream
            .set_read_timeout(deadline.remaining()?)
            .map_err(|e| io_error(e, "configuring socket", deadline))?;
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                raw.extend_from_slice(&buf[..n]);
                if is_complete(&raw, method) {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_error(e, "reading response", deadline)),
        }
    }
    Ok(raw)
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

fn io_error(e: io::Error, what: &str, deadline: &Deadline) -> TransportError {
    if is_timeout(&e) {
        return deadline.expired();
    }
    TransportError::with_source(TransportErrorKind::Io, what, e)
}

/// Whether `raw` already holds a full response, so we can stop before EOF.
fn is_complete(raw: &[u8], method: &str) -> bool {
    let Some(head_end) = find(raw, b"\r\n\r\n") else {
        return false;
    };
    let Ok((status, headers)) = parse_head(&raw[..head_end]) else {
        // Let the parser report it once the peer is done.
        return false;
    };
    let body = &raw[head_end + 4..];
    if !has_body(status, method) {
        return true;
    }
    if is_chunked(&headers) {
        // Malformed chunks will not get better with more bytes.
        return !matches!(walk_chunks(body), Ok(None));
    }
    match content_length(&headers) {
        Ok(Some(len)) => body.len() >= len,
        _ => false,
    }
}

/// Decode a raw HTTP/1.x response into a `Response`.
pub(crate) fn parse_response(raw: &[u8], method: &str) -> Result<Response, ResponseDecodingError> {
    if raw.is_empty() {
        return Err(ResponseDecodingError::new("connection closed before any response"));
    }
    let head_end = find(raw, b"\r\n\r\n")
        .ok_or_else(|| ResponseDecodingError::new("response head is incomplete"))?;
    let (status, headers) = parse_head(&raw[..head_end])?;
    let rest = &raw[head_end + 4..];

    let body = if !has_body(status, method) {
        Vec::new()
    } else if is_chunked(&headers) {
        decode_chunked(rest)?
    } else if let Some(len) = content_length(&headers)? {
        if rest.len() < len {
            return Err(ResponseDecodingError::new(format!(
                "body truncated: expected {len} bytes, got {}",
                rest.len()
            )));
        }
        rest[..len].to_vec()
    } else {
        rest.to_vec()
    };

    Ok(Response::new(status.as_u16(), headers, body))
}

fn parse_head(head: &[u8]) -> Result<(StatusCode, HeaderMap), ResponseDecodingError> {
    let mut lines = head.split(|&b| b == b'\n').map(|l| l.strip_suffix(b"\r").unwrap_or(l));
    let status_line = lines.next().unwrap_or_default();
    let status = parse_status_line(status_line)?;

    let mut headers = HeaderMap::new();
    for line in lines {
        if line.starts_with(b" ") || line.starts_with(b"\t") {
            return Err(ResponseDecodingError::new("folded header lines are not supported"));
        }
        let colon = line.iter().position(|&b| b == b':').ok_or_else(|| {
            ResponseDecodingError::new(format!(
                "malformed header line {:?}",
                String::from_utf8_lossy(line)
            ))
        })?;
        let name = HeaderName::from_bytes(line[..colon].trim_ascii())
            .map_err(|e| ResponseDecodingError::with_source("invalid header name", e))?;
        let value = HeaderValue::from_bytes(line[colon + 1..].trim_ascii())
            .map_err(|e| ResponseDecodingError::with_source("invalid header value", e))?;
        headers.append(name, value);
    }
    Ok((status, headers))
}

fn parse_status_line(line: &[u8]) -> Result<StatusCode, ResponseDecodingError> {
    let bad = || {
        ResponseDecodingError::new(format!(
            "unreadable status line {:?}",
            String::from_utf8_lossy(line)
        ))
    };
    let mut parts = line.splitn(3, |&b| b == b' ');
    let version = parts.next().ok_or_else(bad)?;
    if !version.starts_with(b"HTTP/1.") {
        return Err(bad());
    }
    let code = parts.next().ok_or_else(bad)?;
    StatusCode::from_bytes(code).map_err(|_| bad())
}

fn has_body(status: StatusCode, method: &str) -> bool {
    !(method == "HEAD"
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

fn is_chunked(headers: &HeaderMap) -> bool {
    headers
        .get_all(TRANSFER_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.split(',').any(|c| c.trim().eq_ignore_ascii_case("chunked")))
}

fn content_length(headers: &HeaderMap) -> Result<Option<usize>, ResponseDecodingError> {
    let Some(value) = headers.get(CONTENT_LENGTH) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .map(Some)
        .ok_or_else(|| ResponseDecodingError::new("invalid content-length"))
}

fn decode_chunked(rest: &[u8]) -> Result<Vec<u8>, ResponseDecodingError> {
    walk_chunks(rest)?.ok_or_else(|| ResponseDecodingError::new("chunked body truncated"))
}

/// Walk a chunked body. `Ok(None)` means the bytes so far are a valid prefix
/// and the last chunk has not arrived yet.
fn walk_chunks(mut rest: &[u8]) -> Result<Option<Vec<u8>>, ResponseDecodingError> {
    let mut body = Vec::new();
    loop {
        let Some(line_end) = find(rest, b"\r\n") else {
            return Ok(None);
        };
        let size_field = std::str::from_utf8(&rest[..line_end])
            .ok()
            .and_then(|l| l.split(';').next())
            .map(str::trim)
            .ok_or_else(|| ResponseDecodingError::new("invalid chunk size"))?;
        let size = usize::from_str_radix(size_field, 16).map_err(|e| {
            ResponseDecodingError::with_source(format!("invalid chunk size {size_field:?}"), e)
        })?;
        rest = &rest[line_end + 2..];
        if size == 0 {
            // Trailers, if any, are dropped; the blank line ends the body.
            let done = rest.starts_with(b"\r\n") || find(rest, b"\r\n\r\n").is_some();
            return Ok(done.then_some(body));
        }
        let Some(framed) = size.checked_add(2) else {
            return Err(ResponseDecodingError::new(format!(
                "chunk size {size_field:?} is too large"
            )));
        };
        if rest.len() < framed {
            return Ok(None);
        }
        if &rest[size..framed] != b"\r\n" {
            return Err(ResponseDecodingError::new("chunk not terminated by CRLF"));
        }
        body.extend_from_slice(&rest[..size]);
        rest = &rest[framed..];
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_response() {
        let raw = b"HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: 2\r\n\r\nok";
        let resp = parse_response(raw, "GET").unwrap();
        assert_eq!(resp.code(), 200);
        assert_eq!(resp.header("Content-Type"), Some("text/plain"));
        assert_eq!(resp.body(), b"ok");
    }

    #[test]
    fn body_runs_to_eof_without_length() {
        let raw = b"HTTP/1.0 404 Not Found\r\nServer: test\r\n\r\nmissing\n";
        let resp = parse_response(raw, "GET").unwrap();
        assert_eq!(resp.code(), 404);
        assert_eq!(resp.body(), b"missing\n");
    }

    #[test]
    fn extra_bytes_after_content_length_are_dropped() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\nabcdef";
        assert_eq!(parse_response(raw, "GET").unwrap().body(), b"abc");
    }

    #[test]
    fn repeated_headers_are_kept() {
        let raw = b"HTTP/1.1 200 OK\r\nSet-Cookie: a=1\r\nSet-Cookie: b=2\r\n\r\n";
        let resp = parse_response(raw, "GET").unwrap();
        assert_eq!(resp.header_all("set-cookie"), vec!["a=1", "b=2"]);
    }

    #[test]
    fn decodes_chunked_body() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5;ext=1\r\npedia\r\n0\r\nX-Trailer: t\r\n\r\n";
        let resp = parse_response(raw, "GET").unwrap();
        assert_eq!(resp.body(), b"Wikipedia");
    }

    #[test]
    fn head_and_no_content_have_empty_body() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 512\r\n\r\n";
        assert!(parse_response(raw, "HEAD").unwrap().body().is_empty());

        let raw = b"HTTP/1.1 204 No Content\r\n\r\n";
        assert!(parse_response(raw, "DELETE").unwrap().body().is_empty());
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_response(b"SSH-2.0-OpenSSH_9.6\r\n\r\n", "GET").unwrap_err();
        assert!(err.reason().contains("status line"), "{err}");

        let err = parse_response(b"HTTP/1.1 abc OK\r\n\r\n", "GET").unwrap_err();
        assert!(err.reason().contains("status line"), "{err}");
    }

    #[test]
    fn rejects_empty_and_incomplete() {
        assert!(parse_response(b"", "GET").is_err());
        assert!(parse_response(b"HTTP/1.1 200 OK\r\nContent-", "GET").is_err());
    }

    #[test]
    fn rejects_truncated_body() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort";
        let err = parse_response(raw, "GET").unwrap_err();
        assert!(err.reason().contains("truncated"), "{err}");

        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\na\r\nabc";
        assert!(parse_response(raw, "GET").is_err());
    }

    #[test]
    fn completeness_tracks_length_and_chunks() {
        assert!(!is_complete(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\no", "GET"));
        assert!(is_complete(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok", "GET"));
        assert!(!is_complete(b"HTTP/1.1 200 OK\r\n\r\nok", "GET"));
        assert!(is_complete(b"HTTP/1.1 200 OK\r\nContent-Length: 9\r\n\r\n", "HEAD"));
        assert!(is_complete(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n2\r\nok\r\n0\r\n\r\n",
            "GET"
        ));
    }

    #[test]
    fn chunk_data_ending_in_zero_is_not_the_last_chunk() {
        let head = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec();
        let first = [&head[..], &b"5\r\nab0\r\n\r\n"[..]].concat();
        assert!(!is_complete(&first, "GET"));

        let whole = [&first[..], &b"3\r\nxyz\r\n0\r\n\r\n"[..]].concat();
        assert!(is_complete(&whole, "GET"));
        assert_eq!(parse_response(&whole, "GET").unwrap().body(), b"ab0\r\nxyz");
    }

    #[test]
    fn last_chunk_waits_for_blank_line() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n2\r\nok\r\n0\r\n";
        assert!(!is_complete(raw, "GET"));
        assert!(parse_response(raw, "GET").is_err());
    }

    #[test]
    fn oversized_chunk_is_a_decoding_error() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nffffffffffffffff\r\nabc\r\n0\r\n\r\n";
        assert!(parse_response(raw, "GET").is_err());
        assert!(is_complete(raw, "GET"));

        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nfffffffffffffffff\r\nabc\r\n";
        assert!(parse_response(raw, "GET").is_err());
    }

    #[test]
    fn bad_chunk_terminator_is_rejected() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n2\r\nokXX0\r\n\r\n";
        let err = parse_response(raw, "GET").unwrap_err();
        assert!(err.reason().contains("CRLF"), "{err}");
    }

    #[test]
    fn request_head_layout() {
        let uri = Url::parse("http://example.test:8080/echo?x=1").unwrap();
        let req = HttpRequest::new("PUT", uri);
        let mut headers = HeaderMap::new();
        headers.insert("user-agent", HeaderValue::from_static("agent/1.0"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let head = String::from_utf8(request_head(&req, headers, Some(b"data"))).unwrap();
        assert!(head.starts_with("PUT /echo?x=1 HTTP/1.0\r\n"), "{head}");
        assert!(head.contains("host: example.test:8080\r\n"), "{head}");
        assert!(head.contains("user-agent: agent/1.0\r\n"), "{head}");
        assert!(head.contains("connection: close\r\n"), "{head}");
        assert!(head.contains("content-length: 4\r\n"), "{head}");
        assert!(head.ends_with("\r\n\r\n"));
    }

    #[test]
    fn rejects_https() {
        let err = resolve(&Url::parse("https://example.test/").unwrap()).unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::InvalidRequest);
    }

    #[test]
    fn literal_ips_skip_dns() {
        let addrs = resolve(&Url::parse("http://[::1]:9000/").unwrap()).unwrap();
        assert_eq!(addrs, vec!["[::1]:9000".parse::<SocketAddr>().unwrap()]);
        let addrs = resolve(&Url::parse("http://127.0.0.1/").unwrap()).unwrap();
        assert_eq!(addrs, vec!["127.0.0.1:80".parse::<SocketAddr>().unwrap()]);
    }

    #[test]
    fn expired_deadline_is_timeout() {
        let started = Instant::now() - Duration::from_secs(5);
        let deadline = Deadline::new(started, Some(Duration::from_secs(1)));
        assert!(deadline.remaining().unwrap_err().is_timeout());
        assert_eq!(Deadline::new(Instant::now(), None).remaining().unwrap(), None);
    }
}
