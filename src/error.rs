//! Error types for telemetry ingestion.
//!
//! Every failure the client can observe is local to a single connection.
//! Nothing here is fatal to the host process: errors are surfaced through the
//! error callback so the owning UI can render a disconnected status.
//!
//! ## Error Categories
//!
//! - **Connection Errors**: the endpoint could not be reached or the handshake failed
//! - **Transport Errors**: the live connection failed mid-stream
//! - **Decode Errors**: an inbound message was not a complete telemetry frame
//! - **Endpoint/Config Errors**: invalid URLs or configuration documents
//! - **Replay Errors**: capture files that cannot be read
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use telemetry_stream::TelemetryError;
//!
//! let error = TelemetryError::connection_failed("ws://localhost:8080/ws", "connection refused");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for telemetry operations.
pub type Result<T, E = TelemetryError> = std::result::Result<T, E>;

/// Boxed source error carried by connection and transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for telemetry operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TelemetryError {
    #[error("Failed to connect to {endpoint}: {reason}")]
    Connection {
        endpoint: String,
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Transport error: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Decode error in {context}: {details}")]
    Decode { context: String, details: String },

    #[error("Invalid endpoint '{endpoint}': {details}")]
    InvalidEndpoint { endpoint: String, details: String },

    #[error("Configuration error: {details}")]
    Config { details: String },

    #[error("Replay file error: {path}")]
    Replay {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid timestamp '{value}'")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Invalid {field}: {details}")]
    Validation { field: &'static str, details: String },
}

impl TelemetryError {
    /// Returns whether a fresh connection attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TelemetryError::Connection { .. } => true,
            TelemetryError::Transport { .. } => true,
            TelemetryError::Decode { .. } => false,
            TelemetryError::InvalidEndpoint { .. } => false,
            TelemetryError::Config { .. } => false,
            TelemetryError::Replay { .. } => false,
            TelemetryError::Timestamp { .. } => false,
            TelemetryError::Validation { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TelemetryError::Connection { .. } => vec![
                "Ensure the telemetry server is running",
                "Check host, port and path of the WebSocket endpoint",
                "Open a new connection once the server is reachable",
            ],
            TelemetryError::Transport { .. } => vec![
                "Check network connectivity to the telemetry server",
                "Open a new connection or enable a reconnect policy",
            ],
            TelemetryError::Decode { .. } => vec![
                "Check the producer emits one complete JSON frame per message",
                "Verify required fields (Timestamp, VehicleID, Speed, ...) are present",
            ],
            TelemetryError::InvalidEndpoint { .. } => vec![
                "Use a ws:// or wss:// URL such as ws://localhost:8080/ws",
                "Check the endpoint for typos",
            ],
            TelemetryError::Config { .. } => vec![
                "Check the configuration document syntax",
                "Compare field names against ClientConfig",
            ],
            TelemetryError::Replay { .. } => vec![
                "Check the capture file exists and is readable",
                "Verify the capture holds one JSON frame per line",
            ],
            TelemetryError::Timestamp { .. } => vec![
                "Producers should emit RFC 3339 timestamps such as 2025-01-01T00:00:00Z",
            ],
            TelemetryError::Validation { .. } => vec![
                "Check the producer for out-of-range values",
                "Treat the frame as informational rather than authoritative",
            ],
        }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        TelemetryError::Connection { endpoint: endpoint.into(), reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        endpoint: impl Into<String>,
        reason: impl Into<String>,
        source: BoxError,
    ) -> Self {
        TelemetryError::Connection {
            endpoint: endpoint.into(),
            reason: reason.into(),
            source: Some(source),
        }
    }

    /// Helper constructor for mid-stream transport errors.
    pub fn transport(reason: impl Into<String>) -> Self {
        TelemetryError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for mid-stream transport errors with source.
    pub fn transport_with_source(reason: impl Into<String>, source: BoxError) -> Self {
        TelemetryError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for decode failures.
    pub fn decode(context: impl Into<String>, details: impl Into<String>) -> Self {
        TelemetryError::Decode { context: context.into(), details: details.into() }
    }

    /// Helper constructor for invalid endpoints.
    pub fn invalid_endpoint(endpoint: impl Into<String>, details: impl Into<String>) -> Self {
        TelemetryError::InvalidEndpoint { endpoint: endpoint.into(), details: details.into() }
    }

    /// Helper constructor for replay file errors with path context.
    pub fn replay_error(path: PathBuf, source: std::io::Error) -> Self {
        TelemetryError::Replay { path, source }
    }
}

impl From<serde_json::Error> for TelemetryError {
    fn from(err: serde_json::Error) -> Self {
        TelemetryError::decode("telemetry frame", err.to_string())
    }
}

impl From<serde_yaml_ng::Error> for TelemetryError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        TelemetryError::Config { details: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn error_messages_carry_their_context(
            endpoint in "ws://[a-z]{1,12}:[0-9]{2,5}/ws",
            reason in ".*",
            details in ".*",
        ) {
            let connection = TelemetryError::connection_failed(endpoint.clone(), reason.clone());
            let message = connection.to_string();
            prop_assert!(message.contains(&endpoint));
            prop_assert!(message.contains(&reason));

            let decode = TelemetryError::decode("telemetry frame", details.clone());
            prop_assert!(decode.to_string().contains(&details));

            let transport = TelemetryError::transport(reason.clone());
            prop_assert!(transport.to_string().contains(&reason));
        }

        #[test]
        fn source_chain_is_preserved(base_message in "[a-z ]{1,40}") {
            let io = std::io::Error::other(base_message.clone());
            let error = TelemetryError::transport_with_source("read failed", Box::new(io));

            let source = std::error::Error::source(&error).expect("source should be kept");
            prop_assert_eq!(source.to_string(), base_message);
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<TelemetryError>();

        let error = TelemetryError::transport("reset by peer");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn retry_classification() {
        assert!(TelemetryError::connection_failed("ws://h:1/ws", "refused").is_retryable());
        assert!(TelemetryError::transport("reset").is_retryable());
        assert!(!TelemetryError::decode("frame", "missing field `Speed`").is_retryable());
        assert!(!TelemetryError::invalid_endpoint("http://x", "bad scheme").is_retryable());
    }

    #[test]
    fn every_category_suggests_something() {
        let errors = [
            TelemetryError::connection_failed("ws://h:1/ws", "refused"),
            TelemetryError::transport("reset"),
            TelemetryError::decode("frame", "eof"),
            TelemetryError::invalid_endpoint("ftp://x", "bad scheme"),
            TelemetryError::Config { details: "bad".to_string() },
            TelemetryError::Validation { field: "speed", details: "negative".to_string() },
        ];

        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty(), "{error} has no suggestions");
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn json_errors_become_decode_errors() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let converted: TelemetryError = err.into();
        assert!(matches!(converted, TelemetryError::Decode { .. }));
    }
}
