//! WebSocket provider for live telemetry broadcasters

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use crate::provider::{Inbound, Provider};
use crate::types::CloseEvent;
use crate::{Result, TelemetryError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Live provider reading UTF-8 JSON text frames from a WebSocket
pub struct WebSocketProvider {
    endpoint: String,
    stream: Option<WsStream>,
}

impl WebSocketProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), stream: None }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn check_endpoint(&self) -> Result<()> {
        let scheme_ok = self.endpoint.starts_with("ws://") || self.endpoint.starts_with("wss://");
        if !scheme_ok {
            return Err(TelemetryError::invalid_endpoint(
                self.endpoint.clone(),
                "expected a ws:// or wss:// URL",
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Provider for WebSocketProvider {
    async fn connect(&mut self) -> Result<()> {
        self.check_endpoint()?;
        // Drop any stale stream from an earlier session
        self.stream = None;

        debug!(endpoint = %self.endpoint, "Opening WebSocket");
        let (stream, response) = connect_async(self.endpoint.as_str()).await.map_err(|e| {
            TelemetryError::connection_failed_with_source(
                self.endpoint.clone(),
                "WebSocket handshake failed",
                Box::new(e),
            )
        })?;

        info!(endpoint = %self.endpoint, status = %response.status(), "WebSocket connected");
        self.stream = Some(stream);
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Inbound> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TelemetryError::transport("WebSocket is not connected"))?;

        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Inbound::Text(text.to_string())),
                Some(Ok(Message::Binary(data))) => {
                    // Invalid UTF-8 surfaces later as a decode failure
                    trace!(bytes = data.len(), "Binary message treated as text");
                    return Ok(Inbound::Text(String::from_utf8_lossy(&data).into_owned()));
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {
                    // tungstenite answers pings on the next read/flush
                    continue;
                }
                Some(Ok(Message::Close(frame))) => {
                    self.stream = None;
                    let event = match frame {
                        Some(frame) => CloseEvent::new(Some(u16::from(frame.code)), frame.reason.to_string()),
                        None => CloseEvent::new(None, "close frame without status"),
                    };
                    info!(code = ?event.code, reason = %event.reason, "WebSocket closed by peer");
                    return Ok(Inbound::Closed(event));
                }
                Some(Err(e)) => {
                    self.stream = None;
                    warn!(endpoint = %self.endpoint, error = %e, "WebSocket read failed");
                    return Err(TelemetryError::transport_with_source(
                        "WebSocket read failed",
                        Box::new(e),
                    ));
                }
                None => {
                    self.stream = None;
                    info!(endpoint = %self.endpoint, "WebSocket stream ended without close frame");
                    return Ok(Inbound::Closed(CloseEvent::abnormal("connection dropped")));
                }
            }
        }
    }

    async fn shutdown(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            debug!(endpoint = %self.endpoint, "Closing WebSocket");
            if let Err(e) = stream.close(None).await {
                debug!(error = %e, "WebSocket close handshake failed");
            }
            // Flush the close frame; errors here only mean the peer is already gone
            let _ = stream.flush().await;
        }
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
