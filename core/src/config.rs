//! Configuration-driven transport setup.
//!
//! A `TransportConfig` is the JSON form of "which backends, in what order,
//! with which defaults":
//!
//! ```json
//! {
//!   "preference": ["ureq", "socket"],
//!   "options": { "timeout": 10, "user_agent": "app/1.0", "headers": { "accept": "*/*" } }
//! }
//! ```
//!
//! Every field is optional; `preference` falls back to `DEFAULT_PREFERENCE`.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::options::TransportOptions;
use crate::select::{select_transport, TransportKind, DEFAULT_PREFERENCE};
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub preference: Vec<TransportKind>,
    pub options: TransportOptions,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            preference: DEFAULT_PREFERENCE.to_vec(),
            options: TransportOptions::default(),
        }
    }
}

impl TransportConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Select and construct the transport this config describes.
    pub fn build(&self) -> Result<Box<dyn Transport>, ConfigError> {
        Ok(select_transport(&self.preference, &self.options)?)
    }
}
