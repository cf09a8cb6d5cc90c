//! The transport contract.
//!
//! # Design
//! `Transport` is the object-safe half: the one operation a caller needs,
//! usable as `Box<dyn Transport>` once a backend has been chosen. `Backend`
//! is the static half: the capability probe and the checked constructor,
//! which a selection layer calls before any instance exists.

use crate::error::{RequestError, UnsupportedEnvironmentError};
use crate::options::TransportOptions;
use crate::request::HttpRequest;
use crate::response::Response;

/// Performs one HTTP exchange per call.
///
/// Implementations make exactly one network attempt, never retry, and
/// either return a complete `Response` or fail. Non-2xx statuses are
/// responses, not errors.
pub trait Transport: Send + Sync {
    fn request(&self, request: &HttpRequest) -> Result<Response, RequestError>;

    /// Short backend name, for logs and errors.
    fn name(&self) -> &'static str;
}

/// A concrete transport that can be probed and constructed.
pub trait Backend: Transport + Sized {
    const NAME: &'static str;

    /// Whether this backend can run here. Deterministic, needs no instance.
    fn is_supported() -> bool;

    /// Build without the capability check. Callers go through `new`.
    fn from_options(options: TransportOptions) -> Self;

    fn options(&self) -> &TransportOptions;

    fn new(options: TransportOptions) -> Result<Self, UnsupportedEnvironmentError> {
        if !Self::is_supported() {
            return Err(UnsupportedEnvironmentError {
                transport: Self::NAME,
            });
        }
        Ok(Self::from_options(options))
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderMap;

    use super::*;

    /// A backend that never runs, to exercise the constructor guard.
    struct Unavailable {
        options: TransportOptions,
    }

    impl Transport for Unavailable {
        fn request(&self, _request: &HttpRequest) -> Result<Response, RequestError> {
            Ok(Response::new(200, HeaderMap::new(), ""))
        }

        fn name(&self) -> &'static str {
            Self::NAME
        }
    }

    impl Backend for Unavailable {
        const NAME: &'static str = "unavailable";

        fn is_supported() -> bool {
            false
        }

        fn from_options(options: TransportOptions) -> Self {
            Self { options }
        }

        fn options(&self) -> &TransportOptions {
            &self.options
        }
    }

    #[test]
    fn unsupported_backend_cannot_be_constructed() {
        assert!(!Unavailable::is_supported());
        assert!(!Unavailable::is_supported());
        let err = Unavailable::new(TransportOptions::new()).err().unwrap();
        assert_eq!(err.transport, "unavailable");
    }
}
