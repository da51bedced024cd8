//! Provider trait for telemetry transports

use crate::Result;
use crate::types::CloseEvent;

/// One inbound event from a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A complete text message, expected to hold one JSON frame.
    Text(String),

    /// The peer closed the connection, or it dropped.
    Closed(CloseEvent),
}

/// Trait for telemetry transports
///
/// Providers abstract over where messages come from (a live WebSocket, a
/// recorded capture) and handle their own timing internally. The driver owns
/// the provider exclusively and calls it from a single task.
#[async_trait::async_trait]
pub trait Provider: Send + 'static {
    /// Establish the connection.
    ///
    /// Called again on the same provider when a reconnect policy is active.
    async fn connect(&mut self) -> Result<()>;

    /// Wait for the next inbound message.
    ///
    /// Returns:
    /// - `Ok(Inbound::Text(_))` - a message arrived
    /// - `Ok(Inbound::Closed(_))` - unsolicited close; the provider is disconnected
    /// - `Err(e)` - transport failure mid-stream
    async fn next_message(&mut self) -> Result<Inbound>;

    /// Release the transport. Must be safe to call when already disconnected.
    async fn shutdown(&mut self);

    /// Human-readable endpoint for logs and errors.
    fn endpoint(&self) -> &str;
}
