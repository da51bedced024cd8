//! Observer slots and the state shared between a handle and its driver

use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::TelemetryError;
use crate::types::{CloseEvent, ConnectionState, TelemetryFrame};

/// Consumer of decoded frames
pub type FrameCallback = Box<dyn FnMut(Arc<TelemetryFrame>) + Send>;
/// Notified of an unsolicited close
pub type CloseCallback = Box<dyn FnMut(&CloseEvent) + Send>;
/// Notified of connection, transport and (when escalated) decode failures
pub type ErrorCallback = Box<dyn FnMut(&TelemetryError) + Send>;

/// One registration slot per notification type.
///
/// Registering again replaces the previous callback.
#[derive(Default)]
pub struct Callbacks {
    frame: Option<FrameCallback>,
    close: Option<CloseCallback>,
    error: Option<ErrorCallback>,
}

impl Callbacks {
    pub fn set_frame(&mut self, callback: FrameCallback) {
        self.frame = Some(callback);
    }

    pub fn set_close(&mut self, callback: CloseCallback) {
        self.close = Some(callback);
    }

    pub fn set_error(&mut self, callback: ErrorCallback) {
        self.error = Some(callback);
    }

}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("frame", &self.frame.is_some())
            .field("close", &self.close.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

/// State shared by a [`ConnectionHandle`](super::ConnectionHandle) and its driver task.
///
/// Every publication happens under the callback lock after checking the
/// release token, so once [`Shared::release`] returns nothing is published
/// or delivered again. The lock is reentrant: a callback may release its own
/// connection, in which case the slots are cleared once it returns.
pub(crate) struct Shared {
    callbacks: ReentrantMutex<RefCell<Callbacks>>,
    frame_tx: watch::Sender<Option<Arc<TelemetryFrame>>>,
    state_tx: watch::Sender<ConnectionState>,
    /// Cancelled by the owner to release the connection
    release: CancellationToken,
    /// Cancelled by the driver when its task ends
    finished: CancellationToken,
}

impl Shared {
    pub(crate) fn new(callbacks: Callbacks) -> Arc<Self> {
        let (frame_tx, _) = watch::channel(None);
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        Arc::new(Self {
            callbacks: ReentrantMutex::new(RefCell::new(callbacks)),
            frame_tx,
            state_tx,
            release: CancellationToken::new(),
            finished: CancellationToken::new(),
        })
    }

    pub(crate) fn release_token(&self) -> &CancellationToken {
        &self.release
    }

    pub(crate) fn finished_token(&self) -> &CancellationToken {
        &self.finished
    }

    pub(crate) fn frames(&self) -> watch::Receiver<Option<Arc<TelemetryFrame>>> {
        self.frame_tx.subscribe()
    }

    pub(crate) fn states(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub(crate) fn current_frame(&self) -> Option<Arc<TelemetryFrame>> {
        self.frame_tx.borrow().clone()
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Release the connection. Returns `false` if it was already released.
    ///
    /// From inside a callback the slots are still borrowed; they are cleared
    /// by the dispatch that invoked the callback.
    pub(crate) fn release(&self) -> bool {
        let slots = self.callbacks.lock();
        if self.release.is_cancelled() {
            return false;
        }
        self.release.cancel();
        self.state_tx.send_replace(ConnectionState::Closed);

        let released = slots.try_borrow_mut().map(|mut callbacks| std::mem::take(&mut *callbacks));
        // Captured state is dropped outside the borrow
        drop(released);
        true
    }

    /// Move to `state` unless released.
    pub(crate) fn transition(&self, state: ConnectionState) -> bool {
        let _slots = self.callbacks.lock();
        if self.release.is_cancelled() {
            return false;
        }
        self.state_tx.send_replace(state);
        true
    }

    /// Run `deliver` against the slots unless released.
    fn dispatch(&self, deliver: impl FnOnce(&mut Callbacks)) -> bool {
        let slots = self.callbacks.lock();
        if self.release.is_cancelled() {
            return false;
        }
        deliver(&mut slots.borrow_mut());

        // Released by the callback itself
        if self.release.is_cancelled() {
            let released = std::mem::take(&mut *slots.borrow_mut());
            drop(released);
        }
        true
    }

    /// Replace the current frame and hand it to the frame consumer.
    pub(crate) fn publish_frame(&self, frame: Arc<TelemetryFrame>) -> bool {
        self.dispatch(|callbacks| {
            self.frame_tx.send_replace(Some(Arc::clone(&frame)));
            if let Some(callback) = callbacks.frame.as_mut() {
                callback(frame);
            }
        })
    }

    pub(crate) fn notify_close(&self, event: &CloseEvent) {
        self.dispatch(|callbacks| {
            if let Some(callback) = callbacks.close.as_mut() {
                callback(event);
            }
        });
    }

    pub(crate) fn notify_error(&self, error: &TelemetryError) {
        self.dispatch(|callbacks| {
            if let Some(callback) = callbacks.error.as_mut() {
                callback(error);
            }
        });
    }

    /// Final transition when the driver task ends, released or not.
    pub(crate) fn finish(&self) {
        let _slots = self.callbacks.lock();
        self.state_tx.send_replace(ConnectionState::Closed);
        self.finished.cancel();
    }
}
