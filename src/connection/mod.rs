//! Connection handles returned by [`TelemetryStreamClient::open`](crate::TelemetryStreamClient::open)

pub(crate) mod callbacks;


use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

use crate::stream::ThrottleExt;
use crate::types::{ConnectionState, TelemetryFrame, TelemetrySnapshot, UpdateRate};
use callbacks::Shared;

pub use callbacks::{CloseCallback, ErrorCallback, FrameCallback};

/// Exclusive owner of one live telemetry connection.
///
/// The connection is released exactly once: by [`close`](Self::close) or,
/// failing that, when the handle is dropped. Release works whether or not a
/// frame ever arrived and whether or not the transport already closed.
pub struct ConnectionHandle {
    shared: Arc<Shared>,
    endpoint: String,
}

impl ConnectionHandle {
    pub(crate) fn new(shared: Arc<Shared>, endpoint: String) -> Self {
        Self { shared, endpoint }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Most recent decoded frame, `None` until the first one arrives
    pub fn current_frame(&self) -> Option<Arc<TelemetryFrame>> {
        self.shared.current_frame()
    }

    /// State and latest frame, read together for rendering
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot { state: self.state(), frame: self.current_frame() }
    }

    /// Stream of frames with last-write-wins semantics.
    ///
    /// A slow consumer only ever sees the newest frame. Yields the current
    /// frame first if there is one. Ends once the delivery task has stopped.
    pub fn frames(&self, rate: UpdateRate) -> impl Stream<Item = Arc<TelemetryFrame>> + Send + 'static {
        let frames = WatchStream::new(self.shared.frames())
            .filter_map(|frame| async move { frame })
            .take_until(self.shared.finished_token().clone().cancelled_owned());

        match rate.throttle_interval() {
            None => frames.boxed(),
            Some(interval) => frames.throttle(interval).boxed(),
        }
    }

    /// Stream of state changes, starting with the current state.
    ///
    /// Intermediate states can be skipped by a slow consumer.
    pub fn state_updates(&self) -> impl Stream<Item = ConnectionState> + Send + 'static {
        WatchStream::new(self.shared.states())
    }

    /// Wait until the delivery task has stopped for good.
    pub async fn closed(&self) {
        self.shared.finished_token().cancelled().await;
    }

    /// Release the connection. Idempotent.
    ///
    /// When this returns, no callback of any kind fires again and the current
    /// frame no longer changes. Safe to call from inside one of this
    /// connection's callbacks.
    pub fn close(&self) {
        if self.shared.release() {
            debug!(endpoint = %self.endpoint, "Connection released");
        }
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        // Release on every exit path of the owner
        self.close();
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state())
            .finish()
    }
}
