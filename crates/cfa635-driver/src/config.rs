//! Connection settings.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LcdError, LcdResult};

/// Settings for connecting to a module.
///
/// Every field has a default, so a YAML file only needs the keys it changes:
///
/// ```yaml
/// port: /dev/lcd
/// response_timeout_ms: 500
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Serial device path.
    pub port: String,
    /// Line rate in baud.
    pub baud_rate: u32,
    /// How long a command waits for its response.
    pub response_timeout_ms: u64,
    /// How long a packet may take to arrive once its first byte has.
    pub packet_timeout_ms: u64,
    /// Reports buffered for the caller before new ones are dropped.
    pub report_queue_depth: usize,
    /// Serial read timeout; bounds how quickly the reader notices shutdown.
    pub read_poll_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            response_timeout_ms: 250,
            packet_timeout_ms: 250,
            report_queue_depth: 64,
            read_poll_ms: 100,
        }
    }
}

impl ConnectionConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> LcdResult<Self> {
        let config: ConnectionConfig =
            serde_yaml::from_str(yaml).map_err(|e| LcdError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn load(path: impl AsRef<Path>) -> LcdResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Reject settings the driver cannot run with.
    pub fn validate(&self) -> LcdResult<()> {
        if self.baud_rate == 0 {
            return Err(LcdError::Config("baud_rate must be positive".into()));
        }
        if self.response_timeout_ms == 0 {
            return Err(LcdError::Config("response_timeout_ms must be positive".into()));
        }
        if self.packet_timeout_ms == 0 {
            return Err(LcdError::Config("packet_timeout_ms must be positive".into()));
        }
        if self.report_queue_depth == 0 {
            return Err(LcdError::Config("report_queue_depth must be positive".into()));
        }
        if self.read_poll_ms == 0 {
            return Err(LcdError::Config("read_poll_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn packet_timeout(&self) -> Duration {
        Duration::from_millis(self.packet_timeout_ms)
    }

    pub fn read_poll(&self) -> Duration {
        Duration::from_millis(self.read_poll_ms)
    }
}
