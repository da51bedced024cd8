//! Driver spawns and runs the delivery task for one connection

use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::config::{ClientConfig, DecodePolicy, ReconnectPolicy};
use crate::connection::callbacks::Shared;
use crate::provider::{Inbound, Provider};
use crate::types::{ConnectionState, TelemetryFrame};

/// How a single session (one successful connect) ended
enum SessionEnd {
    /// The owner released the connection
    Released,
    /// Unsolicited close or transport failure
    Dropped,
}

/// Publishes the final `Closed` state when the delivery task ends,
/// including by unwinding out of a consumer callback.
struct FinishOnDrop(Arc<Shared>);

impl Drop for FinishOnDrop {
    fn drop(&mut self) {
        if std::thread::panicking() {
            warn!("Delivery task panicked, closing connection");
        }
        self.0.finish();
    }
}

/// Driver owns the provider and runs the connection state machine
///
/// All decoding and dispatch happen on the spawned task, one message at a
/// time, in transport order.
pub(crate) struct Driver<P> {
    provider: P,
    shared: Arc<Shared>,
    vehicle_id: Option<String>,
    reconnect: ReconnectPolicy,
    decode_failures: DecodePolicy,
    frame_count: u64,
    decode_failure_count: u64,
}

impl<P: Provider> Driver<P> {
    /// Spawn the delivery task. Returns immediately.
    pub(crate) fn spawn(provider: P, config: &ClientConfig, shared: Arc<Shared>) {
        let driver = Self {
            provider,
            shared,
            vehicle_id: config.vehicle_id.clone(),
            reconnect: config.reconnect,
            decode_failures: config.decode_failures,
            frame_count: 0,
            decode_failure_count: 0,
        };
        tokio::spawn(driver.run());
    }

    async fn run(mut self) {
        let endpoint = self.provider.endpoint().to_string();
        info!(endpoint = %endpoint, "Delivery task started");
        let finish = FinishOnDrop(Arc::clone(&self.shared));
        let release = self.shared.release_token().clone();
        let mut failed_attempts = 0u32;

        loop {
            if !self.shared.transition(ConnectionState::Connecting) {
                break;
            }

            let connected = tokio::select! {
                biased;
                _ = release.cancelled() => {
                    debug!("Released while connecting");
                    break;
                }
                result = self.provider.connect() => result,
            };

            match connected {
                Ok(()) => {
                    failed_attempts = 0;
                    if !self.shared.transition(ConnectionState::Open) {
                        self.provider.shutdown().await;
                        break;
                    }
                    info!(endpoint = %endpoint, "Telemetry connection open");

                    match self.session().await {
                        SessionEnd::Released => break,
                        SessionEnd::Dropped => {}
                    }
                }
                Err(e) => {
                    failed_attempts += 1;
                    warn!(endpoint = %endpoint, error = %e, "Connection attempt failed");
                    self.shared.notify_error(&e);
                    if !e.is_retryable() {
                        debug!(error = %e, "Connection error is permanent, not reconnecting");
                        break;
                    }
                }
            }

            if !self.shared.transition(ConnectionState::Closed) {
                break;
            }

            // Dropped sessions count as the first attempt of a new cycle
            let attempt = failed_attempts.max(1);
            let Some(delay) = self.reconnect.delay_for(attempt) else {
                debug!(attempts = failed_attempts, "Not reconnecting");
                break;
            };

            info!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting after backoff");
            tokio::select! {
                biased;
                _ = release.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        drop(finish);
        info!(
            endpoint = %endpoint,
            frames = self.frame_count,
            decode_failures = self.decode_failure_count,
            "Delivery task ended"
        );
    }

    /// Pump messages until the session ends
    async fn session(&mut self) -> SessionEnd {
        let release = self.shared.release_token().clone();

        loop {
            let inbound = tokio::select! {
                biased;
                _ = release.cancelled() => {
                    debug!("Released, shutting down transport");
                    self.provider.shutdown().await;
                    return SessionEnd::Released;
                }
                inbound = self.provider.next_message() => inbound,
            };

            match inbound {
                Ok(Inbound::Text(text)) => self.handle_text(&text),
                Ok(Inbound::Closed(event)) => {
                    info!(code = ?event.code, reason = %event.reason, "Connection closed by peer");
                    self.shared.notify_close(&event);
                    return SessionEnd::Dropped;
                }
                Err(e) => {
                    warn!(error = %e, "Transport error");
                    self.shared.notify_error(&e);
                    self.provider.shutdown().await;
                    return SessionEnd::Dropped;
                }
            }
        }
    }

    fn handle_text(&mut self, text: &str) {
        let frame = match TelemetryFrame::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                self.decode_failure_count += 1;
                warn!(
                    error = %e,
                    bytes = text.len(),
                    failures = self.decode_failure_count,
                    "Dropping undecodable message"
                );
                if self.decode_failures == DecodePolicy::Escalate {
                    self.shared.notify_error(&e);
                }
                return;
            }
        };

        if let Some(target) = self.vehicle_id.as_deref() {
            if frame.vehicle_id != target {
                trace!(vehicle = %frame.vehicle_id, "Ignoring frame for other vehicle");
                return;
            }
        }

        self.frame_count += 1;
        trace!(count = self.frame_count, timestamp = %frame.timestamp, "Frame decoded");
        self.shared.publish_frame(Arc::new(frame));
    }
}
