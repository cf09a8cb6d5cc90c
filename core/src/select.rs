//! Picking a backend by preference and capability.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::backends::mock::MockTransport;
use crate::backends::UREQ_NAME;
use crate::backends::socket::SocketTransport;
#[cfg(feature = "ureq")]
use crate::backends::ureq_client::UreqTransport;
use crate::error::{NoTransportAvailable, UnsupportedEnvironmentError};
use crate::options::TransportOptions;
use crate::transport::{Backend, Transport};

/// The backends this crate ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Ureq,
    Socket,
    Mock,
}

/// Library-backed first, hand-written socket as fallback.
pub const DEFAULT_PREFERENCE: &[TransportKind] = &[TransportKind::Ureq, TransportKind::Socket];

impl TransportKind {
    pub fn name(self) -> &'static str {
        match self {
            TransportKind::Ureq => UREQ_NAME,
            TransportKind::Socket => SocketTransport::NAME,
            TransportKind::Mock => MockTransport::NAME,
        }
    }

    /// Capability probe; needs no instance.
    pub fn is_supported(self) -> bool {
        match self {
            #[cfg(feature = "ureq")]
            TransportKind::Ureq => UreqTransport::is_supported(),
            #[cfg(not(feature = "ureq"))]
            TransportKind::Ureq => false,
            TransportKind::Socket => SocketTransport::is_supported(),
            TransportKind::Mock => MockTransport::is_supported(),
        }
    }

    pub fn build(
        self,
        options: TransportOptions,
    ) -> Result<Box<dyn Transport>, UnsupportedEnvironmentError> {
        let transport: Box<dyn Transport> = match self {
            #[cfg(feature = "ureq")]
            TransportKind::Ureq => Box::new(UreqTransport::new(options)?),
            #[cfg(not(feature = "ureq"))]
            TransportKind::Ureq => {
                let _ = options;
                return Err(UnsupportedEnvironmentError {
                    transport: UREQ_NAME,
                });
            }
            TransportKind::Socket => Box::new(SocketTransport::new(options)?),
            TransportKind::Mock => Box::new(MockTransport::new(options)?),
        };
        Ok(transport)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Build the first transport in `preference` whose probe succeeds.
pub fn select_transport(
    preference: &[TransportKind],
    options: &TransportOptions,
) -> Result<Box<dyn Transport>, NoTransportAvailable> {
    for &kind in preference {
        if !kind.is_supported() {
            tracing::debug!(transport = %kind, "transport not supported here, skipping");
            continue;
        }
        match kind.build(options.clone()) {
            Ok(transport) => {
                tracing::info!(transport = %kind, "selected transport");
                return Ok(transport);
            }
            Err(e) => {
                tracing::debug!(transport = %kind, error = %e, "transport construction failed")
            }
        }
    }
    Err(NoTransportAvailable {
        tried: preference.to_vec(),
    })
}
