//! Client configuration
//!
//! Loaded from YAML or built in code. Every field has a default, so an empty
//! document is a valid configuration:
//!
//! ```rust
//! use telemetry_stream::{ClientConfig, DecodePolicy, ReconnectPolicy};
//!
//! let config = ClientConfig::from_yaml_str(
//!     "endpoint: ws://10.0.0.5:8080/ws\n\
//!      vehicle_id: test-vehicle\n\
//!      reconnect: !backoff\n  initial_ms: 250\n  max_ms: 4000\n  max_attempts: 5\n",
//! )
//! .unwrap();
//!
//! assert_eq!(config.vehicle_id.as_deref(), Some("test-vehicle"));
//! assert_eq!(config.decode_failures, DecodePolicy::Drop);
//! assert!(matches!(config.reconnect, ReconnectPolicy::Backoff { .. }));
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Result, TelemetryError};

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8080/ws";

/// Options for a [`TelemetryStreamClient`](crate::TelemetryStreamClient).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket URL of the telemetry broadcaster.
    pub endpoint: String,

    /// Only frames for this vehicle become current when set.
    pub vehicle_id: Option<String>,

    pub reconnect: ReconnectPolicy,

    pub decode_failures: DecodePolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            vehicle_id: None,
            reconnect: ReconnectPolicy::Never,
            decode_failures: DecodePolicy::Drop,
        }
    }
}

impl ClientConfig {
    /// Configuration for the broadcaster at `ws://{host}:{port}/ws`.
    pub fn for_host(host: &str, port: u16) -> Self {
        Self { endpoint: format!("ws://{host}:{port}/ws"), ..Self::default() }
    }

    pub fn with_vehicle(mut self, vehicle_id: impl Into<String>) -> Self {
        self.vehicle_id = Some(vehicle_id.into());
        self
    }

    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn with_decode_failures(mut self, policy: DecodePolicy) -> Self {
        self.decode_failures = policy;
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| TelemetryError::Config {
            details: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_yaml_str(&yaml)
    }

    fn validate(&self) -> Result<()> {
        if let ReconnectPolicy::Backoff { initial_ms, max_ms, .. } = self.reconnect {
            if initial_ms == 0 || max_ms < initial_ms {
                return Err(TelemetryError::Config {
                    details: format!(
                        "backoff needs 0 < initial_ms <= max_ms (got {initial_ms}, {max_ms})"
                    ),
                });
            }
        }
        if matches!(self.vehicle_id.as_deref(), Some("")) {
            return Err(TelemetryError::Config { details: "vehicle_id must not be empty".to_string() });
        }
        Ok(())
    }
}

/// What happens after an unsolicited close or connection failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconnectPolicy {
    /// Stay `Closed` until the owner opens a new connection.
    #[default]
    Never,

    /// Reconnect with exponential backoff.
    Backoff {
        initial_ms: u64,
        max_ms: u64,
        /// Reconnect attempts after a failure before giving up. The
        /// initial connect is not counted.
        max_attempts: u32,
    },
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt `attempt` (1-based), or `None` once
    /// `attempt` exceeds `max_attempts`.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        match *self {
            ReconnectPolicy::Never => None,
            ReconnectPolicy::Backoff { initial_ms, max_ms, max_attempts } => {
                if attempt == 0 || attempt > max_attempts {
                    return None;
                }
                let factor = 1u64 << (attempt - 1).min(32);
                Some(Duration::from_millis(initial_ms.saturating_mul(factor).min(max_ms)))
            }
        }
    }
}

/// Handling of inbound messages that are not a complete telemetry frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Log and drop the message; the stream stays alive.
    #[default]
    Drop,

    /// Report through the error callback; the stream stays alive.
    Escalate,
}
