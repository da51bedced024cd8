//! Connection lifecycle and the dashboard-facing view of it

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::TelemetryFrame;

/// WebSocket close code for a normal closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// WebSocket close code reported when the connection dropped without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Lifecycle of a single telemetry connection.
///
/// `Idle -> Connecting -> Open -> Closed`. Without a reconnect policy
/// `Closed` is terminal for the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    pub fn is_open(self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    pub fn is_closed(self) -> bool {
        matches!(self, ConnectionState::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// An unsolicited close of the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct CloseEvent {
    /// Close code sent by the peer, if it sent one.
    pub code: Option<u16>,
    pub reason: String,
}

impl CloseEvent {
    pub fn new(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self { code, reason: reason.into() }
    }

    /// Connection lost without a close handshake.
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(Some(CLOSE_ABNORMAL), reason)
    }

    pub fn is_normal(&self) -> bool {
        self.code == Some(CLOSE_NORMAL)
    }
}

/// What a dashboard renders: connection state plus the latest frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    pub state: ConnectionState,
    pub frame: Option<Arc<TelemetryFrame>>,
}

impl TelemetrySnapshot {
    /// Live data is flowing: the connection is open and at least one frame arrived.
    pub fn is_connected(&self) -> bool {
        self.state.is_open() && self.frame.is_some()
    }

    /// No frame has been received yet; render a waiting state.
    pub fn is_waiting(&self) -> bool {
        self.frame.is_none()
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_connected() { "Connected" } else { "Disconnected" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Arc<TelemetryFrame> {
        Arc::new(
            TelemetryFrame::decode(
                r#"{"Timestamp":"2025-01-01T00:00:00Z","VehicleID":"v1","Speed":12.5,
                    "SteeringAngle":0,"Throttle":0,"Brake":0,"Gear":1,
                    "Location":{"Latitude":0,"Longitude":0,"Heading":0}}"#,
            )
            .unwrap(),
        )
    }

    #[test]
    fn waiting_before_first_frame() {
        let snapshot = TelemetrySnapshot { state: ConnectionState::Open, frame: None };
        assert!(snapshot.is_waiting());
        assert!(!snapshot.is_connected());
        assert_eq!(snapshot.status_label(), "Disconnected");
    }

    #[test]
    fn connected_needs_open_state_and_frame() {
        let live = TelemetrySnapshot { state: ConnectionState::Open, frame: Some(frame()) };
        assert_eq!(live.status_label(), "Connected");

        let dropped = TelemetrySnapshot { state: ConnectionState::Closed, ..live };
        assert!(!dropped.is_waiting());
        assert_eq!(dropped.status_label(), "Disconnected");
    }

    #[test]
    fn close_event_codes() {
        assert!(CloseEvent::new(Some(CLOSE_NORMAL), "bye").is_normal());
        assert_eq!(CloseEvent::abnormal("eof").code, Some(1006));
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
    }
}
