//! Live vehicle telemetry ingestion over WebSocket.
//!
//! A telemetry broadcaster pushes one JSON document per vehicle sample. This
//! crate owns a single connection to it, decodes every message into a typed
//! [`TelemetryFrame`], and keeps only the most recent one: newer frames
//! replace older frames, nothing is queued.
//!
//! # Features
//!
//! - **Observer callbacks**: one frame consumer plus close and error notifications
//! - **Pull access**: current frame, connection state and throttled frame streams
//! - **Scoped release**: closing or dropping the handle tears the transport down exactly once
//! - **Replay**: play recorded JSONL captures through the same pipeline
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use telemetry_stream::{ClientConfig, TelemetryStreamClient, UpdateRate};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ClientConfig::for_host("localhost", 8080).with_vehicle("test-vehicle");
//!     let connection = TelemetryStreamClient::with_config(config)
//!         .on_error(|error| eprintln!("telemetry: {error}"))
//!         .open_configured();
//!
//!     let mut frames = connection.frames(UpdateRate::Max(10));
//!     while let Some(frame) = frames.next().await {
//!         println!("{:.2} km/h in gear {}", frame.speed, frame.gear);
//!     }
//! }
//! ```

mod client;
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

pub mod config;
pub mod connection;
mod driver;
pub mod provider;
pub mod providers;
pub mod stream;

pub use client::TelemetryStreamClient;
pub use config::{ClientConfig, DecodePolicy, ReconnectPolicy};
pub use connection::ConnectionHandle;
pub use error::*;
pub use types::*;
