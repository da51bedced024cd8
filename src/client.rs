//! The telemetry stream client

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::TelemetryError;
use crate::config::ClientConfig;
use crate::connection::ConnectionHandle;
use crate::connection::callbacks::{Callbacks, Shared};
use crate::driver::Driver;
use crate::provider::Provider;
use crate::providers::{ReplayProvider, WebSocketProvider};
use crate::types::{CloseEvent, TelemetryFrame};

/// Builds and opens one live telemetry connection.
///
/// Callbacks are registered before opening; each slot holds a single
/// consumer and a later registration replaces an earlier one. Callbacks run
/// synchronously on the connection's delivery task, one message at a time.
///
/// ```rust,no_run
/// use telemetry_stream::TelemetryStreamClient;
///
/// # #[tokio::main]
/// # async fn main() {
/// let connection = TelemetryStreamClient::new()
///     .on_frame(|frame| println!("{} km/h", frame.speed))
///     .on_close(|event| println!("closed: {}", event.reason))
///     .on_error(|error| eprintln!("telemetry error: {error}"))
///     .open("ws://localhost:8080/ws");
///
/// // ... render connection.snapshot() ...
/// connection.close();
/// # }
/// ```
#[derive(Debug, Default)]
pub struct TelemetryStreamClient {
    config: ClientConfig,
    callbacks: Callbacks,
}

impl TelemetryStreamClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self { config, callbacks: Callbacks::default() }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Register the sole consumer of decoded frames.
    pub fn on_frame<F>(mut self, callback: F) -> Self
    where
        F: FnMut(Arc<TelemetryFrame>) + Send + 'static,
    {
        self.callbacks.set_frame(Box::new(callback));
        self
    }

    /// Register for unsolicited close notifications.
    pub fn on_close<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&CloseEvent) + Send + 'static,
    {
        self.callbacks.set_close(Box::new(callback));
        self
    }

    /// Register for connection, transport and escalated decode errors.
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&TelemetryError) + Send + 'static,
    {
        self.callbacks.set_error(Box::new(callback));
        self
    }

    /// Open a WebSocket connection to `endpoint`.
    ///
    /// Returns immediately. Failures, including an invalid endpoint, are
    /// reported through the error callback and leave the handle `Closed`.
    /// Must be called from within a tokio runtime.
    pub fn open(self, endpoint: impl Into<String>) -> ConnectionHandle {
        self.open_provider(WebSocketProvider::new(endpoint))
    }

    /// Open a WebSocket connection to the configured endpoint.
    pub fn open_configured(self) -> ConnectionHandle {
        let endpoint = self.config.endpoint.clone();
        self.open(endpoint)
    }

    /// Play a recorded capture instead of a live stream.
    pub fn open_replay<P: AsRef<Path>>(self, path: P, rate_hz: f64) -> ConnectionHandle {
        self.open_provider(ReplayProvider::new(path).with_rate(rate_hz))
    }

    /// Open a connection over any transport.
    pub fn open_provider<P: Provider>(self, provider: P) -> ConnectionHandle {
        let endpoint = provider.endpoint().to_string();
        info!(
            endpoint = %endpoint,
            vehicle_id = ?self.config.vehicle_id,
            reconnect = ?self.config.reconnect,
            "Opening telemetry stream"
        );

        let shared = Shared::new(self.callbacks);
        Driver::spawn(provider, &self.config, Arc::clone(&shared));
        ConnectionHandle::new(shared, endpoint)
    }
}
