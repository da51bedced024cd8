//! Core types for decoded telemetry and connection state.
//!
//! - [`TelemetryFrame`] is one decoded message, shared immutably as `Arc<TelemetryFrame>`
//! - [`ConnectionState`] tracks the `Idle -> Connecting -> Open -> Closed` lifecycle
//! - [`TelemetrySnapshot`] pairs the two for rendering
//! - [`UpdateRate`] controls how often frame streams yield
//!
//! ## Usage Example
//!
//! ```rust
//! use telemetry_stream::types::TelemetryFrame;
//!
//! let frame = TelemetryFrame::decode(r#"{
//!     "Timestamp": "2025-01-01T00:00:00Z",
//!     "VehicleID": "v1",
//!     "Speed": 12.5,
//!     "SteeringAngle": 0.0,
//!     "Throttle": 0.4,
//!     "Brake": 0.0,
//!     "Gear": 2,
//!     "Location": {"Latitude": 35.0, "Longitude": -117.0, "Heading": 180.0}
//! }"#).unwrap();
//!
//! assert_eq!(frame.speed, 12.5);
//! assert!(frame.metadata.is_empty());
//! ```

mod frame;
mod state;
mod update_rate;

pub use frame::{EMERGENCY_BRAKE, EMERGENCY_SPEED, Location, TelemetryFrame};
pub use state::{CLOSE_ABNORMAL, CLOSE_NORMAL, CloseEvent, ConnectionState, TelemetrySnapshot};
pub use update_rate::UpdateRate;
