//! Test utilities: sample frames, capture files and a scripted provider
//!
//! Shared by unit tests and the benchmarks.

#![cfg(any(test, feature = "benchmark"))]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;
use tokio::sync::mpsc;

use crate::provider::{Inbound, Provider};
use crate::types::CloseEvent;
use crate::{Result, TelemetryError};

/// A complete frame in the nested-location wire shape.
pub fn frame_json(vehicle_id: &str, speed: f64) -> String {
    json!({
        "Timestamp": "2025-01-01T00:00:00Z",
        "VehicleID": vehicle_id,
        "Speed": speed,
        "SteeringAngle": 1.5,
        "Throttle": 0.3,
        "Brake": 0.0,
        "Gear": 3,
        "Location": {"Latitude": 35.0, "Longitude": -117.0, "Heading": 45.0},
        "Metadata": {"source": "test"}
    })
    .to_string()
}

/// Capture file removed on drop
pub struct CaptureFile {
    path: PathBuf,
}

impl CaptureFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CaptureFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Write `lines` to a fresh JSONL capture in the temp directory.
pub fn write_capture(lines: &[String]) -> CaptureFile {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    let name = format!(
        "telemetry-capture-{}-{}.jsonl",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    );
    let path = std::env::temp_dir().join(name);

    let mut file = std::fs::File::create(&path).expect("create capture file");
    for line in lines {
        writeln!(file, "{line}").expect("write capture line");
    }
    CaptureFile { path }
}

/// What the scripted transport does next
#[derive(Debug)]
pub enum Script {
    Text(String),
    Close(CloseEvent),
    Fail(String),
}

/// Observable side of a [`ScriptedProvider`]
#[derive(Clone, Default)]
pub struct ProviderProbe {
    connects: Arc<AtomicUsize>,
    shutdowns: Arc<AtomicUsize>,
}

impl ProviderProbe {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

/// In-memory transport driven by a channel of [`Script`] steps.
///
/// Connection attempts fail while `failing_connects` is non-zero. A dropped
/// script sender behaves like a silent, still-open connection.
pub struct ScriptedProvider {
    script: mpsc::UnboundedReceiver<Script>,
    connect: ConnectBehavior,
    failing_connects: usize,
    connected: bool,
    probe: ProviderProbe,
}

/// How [`ScriptedProvider::connect`] resolves once the failing attempts are used up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectBehavior {
    Accept,
    /// Never resolves, like a handshake to an unresponsive host
    Hang,
    /// Fails with a permanent `InvalidEndpoint` error
    Reject,
}

/// A scripted provider with the sender that drives it and its probe.
pub fn scripted_provider() -> (ScriptedProvider, mpsc::UnboundedSender<Script>, ProviderProbe) {
    let (tx, rx) = mpsc::unbounded_channel();
    let probe = ProviderProbe::default();
    let provider = ScriptedProvider {
        script: rx,
        connect: ConnectBehavior::Accept,
        failing_connects: 0,
        connected: false,
        probe: probe.clone(),
    };
    (provider, tx, probe)
}

impl ScriptedProvider {
    pub fn failing_connects(mut self, count: usize) -> Self {
        self.failing_connects = count;
        self
    }

    /// Connection attempts stay pending forever.
    pub fn hanging_connect(mut self) -> Self {
        self.connect = ConnectBehavior::Hang;
        self
    }

    /// Connection attempts fail as if the endpoint were malformed.
    pub fn rejecting_endpoint(mut self) -> Self {
        self.connect = ConnectBehavior::Reject;
        self
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    async fn connect(&mut self) -> Result<()> {
        self.probe.connects.fetch_add(1, Ordering::SeqCst);
        if self.failing_connects > 0 {
            self.failing_connects -= 1;
            return Err(TelemetryError::connection_failed("scripted://", "connection refused"));
        }
        match self.connect {
            ConnectBehavior::Accept => {
                self.connected = true;
                Ok(())
            }
            ConnectBehavior::Hang => std::future::pending().await,
            ConnectBehavior::Reject => {
                Err(TelemetryError::invalid_endpoint("scripted://", "unsupported scheme"))
            }
        }
    }

    async fn next_message(&mut self) -> Result<Inbound> {
        match self.script.recv().await {
            Some(Script::Text(text)) => Ok(Inbound::Text(text)),
            Some(Script::Close(event)) => {
                self.connected = false;
                Ok(Inbound::Closed(event))
            }
            Some(Script::Fail(reason)) => {
                self.connected = false;
                Err(TelemetryError::transport(reason))
            }
            None => std::future::pending().await,
        }
    }

    async fn shutdown(&mut self) {
        if self.connected {
            self.connected = false;
            self.probe.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn endpoint(&self) -> &str {
        "scripted://"
    }
}
