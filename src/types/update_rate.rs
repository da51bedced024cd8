//! Update rate control for frame streams

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Delivery rate for frame streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum UpdateRate {
    /// Every frame as it arrives
    Native,

    /// At most this many frames per second, latest wins.
    /// `Max(0)` is treated as `Native`.
    Max(u32),
}

impl UpdateRate {
    /// Normalize degenerate rates
    pub fn normalize(self) -> Self {
        match self {
            UpdateRate::Max(0) => UpdateRate::Native,
            rate => rate,
        }
    }

    /// Get throttle interval if needed. Never zero.
    pub fn throttle_interval(self) -> Option<Duration> {
        match self.normalize() {
            UpdateRate::Native => None,
            UpdateRate::Max(hz) => {
                Some(Duration::from_secs_f64(1.0 / hz as f64).max(Duration::from_nanos(1)))
            }
        }
    }
}
