//! Replay provider for recorded telemetry captures
//!
//! A capture is a newline-delimited JSON file, one frame per line, as written
//! by a logger tapping the broadcaster. Blank lines are skipped. Lines are
//! emitted verbatim, so malformed lines exercise the same decode path as a
//! live stream.

use std::path::{Path, PathBuf};

use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use crate::provider::{Inbound, Provider};
use crate::types::{CLOSE_NORMAL, CloseEvent};
use crate::{Result, TelemetryError};

/// Rate of the vehicle agent in the reference deployment.
pub const DEFAULT_REPLAY_HZ: f64 = 10.0;

/// Replay provider that plays a capture file at a fixed rate
pub struct ReplayProvider {
    path: PathBuf,

    /// `replay:` URL used in logs
    endpoint: String,

    /// Messages loaded on connect
    lines: Vec<String>,

    /// Next line to emit
    position: usize,

    /// Emission rate in Hz
    rate_hz: f64,

    /// Frame pacing interval, created on connect
    interval: Option<Interval>,
}

impl ReplayProvider {
    /// Create a provider for `path` at [`DEFAULT_REPLAY_HZ`]
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let endpoint = format!("replay:{}", path.display());
        Self { path, endpoint, lines: Vec::new(), position: 0, rate_hz: DEFAULT_REPLAY_HZ, interval: None }
    }

    /// Set the emission rate, clamped to 0.1..=1000 Hz.
    /// Non-finite rates fall back to [`DEFAULT_REPLAY_HZ`].
    pub fn with_rate(mut self, rate_hz: f64) -> Self {
        self.rate_hz = if rate_hz.is_finite() { rate_hz.clamp(0.1, 1000.0) } else { DEFAULT_REPLAY_HZ };
        self
    }

    pub fn rate_hz(&self) -> f64 {
        self.rate_hz
    }

    /// Messages in the loaded capture (zero before connect)
    pub fn total_messages(&self) -> usize {
        self.lines.len()
    }

    /// Messages not yet emitted
    pub fn remaining(&self) -> usize {
        self.lines.len().saturating_sub(self.position)
    }
}

#[async_trait::async_trait]
impl Provider for ReplayProvider {
    async fn connect(&mut self) -> Result<()> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| TelemetryError::replay_error(self.path.clone(), e))?;

        self.lines = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();
        self.position = 0;

        let mut pacing = interval(Duration::from_secs_f64(1.0 / self.rate_hz));
        pacing.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(pacing);

        info!(
            path = %self.path.display(),
            messages = self.lines.len(),
            rate_hz = self.rate_hz,
            "Opened telemetry capture"
        );
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Inbound> {
        if self.interval.is_none() {
            return Err(TelemetryError::transport("replay is not connected"));
        }

        if self.position >= self.lines.len() {
            debug!(path = %self.path.display(), "Reached end of capture");
            self.interval = None;
            return Ok(Inbound::Closed(CloseEvent::new(Some(CLOSE_NORMAL), "end of replay")));
        }

        if let Some(pacing) = self.interval.as_mut() {
            pacing.tick().await;
        }

        let line = self.lines[self.position].clone();
        self.position += 1;
        trace!(position = self.position, total = self.lines.len(), "Replay message");
        Ok(Inbound::Text(line))
    }

    async fn shutdown(&mut self) {
        self.interval = None;
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[tokio::test]
    async fn plays_lines_then_closes_normally() {
        let capture = test_utils::write_capture(&[
            test_utils::frame_json("v1", 10.0),
            String::new(),
            test_utils::frame_json("v1", 20.0),
        ]);

        let mut provider = ReplayProvider::new(capture.path()).with_rate(1000.0);
        provider.connect().await.unwrap();
        assert_eq!(provider.total_messages(), 2);

        let mut texts = Vec::new();
        loop {
            match provider.next_message().await.unwrap() {
                Inbound::Text(text) => texts.push(text),
                Inbound::Closed(event) => {
                    assert!(event.is_normal());
                    break;
                }
            }
        }
        assert_eq!(texts.len(), 2);
        assert!(texts[1].contains("20"));
        assert_eq!(provider.remaining(), 0);
    }

    #[tokio::test]
    async fn reconnect_restarts_from_the_beginning() {
        let capture = test_utils::write_capture(&[test_utils::frame_json("v1", 1.0)]);
        let mut provider = ReplayProvider::new(capture.path()).with_rate(1000.0);

        for _ in 0..2 {
            provider.connect().await.unwrap();
            assert!(matches!(provider.next_message().await.unwrap(), Inbound::Text(_)));
            assert!(matches!(provider.next_message().await.unwrap(), Inbound::Closed(_)));
        }
    }

    #[tokio::test]
    async fn missing_file_is_a_replay_error() {
        let mut provider = ReplayProvider::new("/definitely/not/here.jsonl");
        assert_eq!(provider.endpoint(), "replay:/definitely/not/here.jsonl");
        assert!(matches!(provider.connect().await, Err(TelemetryError::Replay { .. })));
        assert!(provider.next_message().await.is_err());
    }

    #[test]
    fn rate_is_clamped() {
        assert_eq!(ReplayProvider::new("x").with_rate(0.0).rate_hz(), 0.1);
        assert_eq!(ReplayProvider::new("x").rate_hz(), DEFAULT_REPLAY_HZ);
        assert_eq!(ReplayProvider::new("x").with_rate(f64::NAN).rate_hz(), DEFAULT_REPLAY_HZ);
        assert_eq!(ReplayProvider::new("x").with_rate(f64::INFINITY).rate_hz(), DEFAULT_REPLAY_HZ);
    }
}
