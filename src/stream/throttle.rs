//! Stream throttling utilities

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Extension trait to add throttling to any Stream
pub trait ThrottleExt: Stream {
    /// Emit at most once per `duration`.
    ///
    /// Latest wins: items arriving within one interval replace each other and
    /// only the newest is emitted. Nothing is queued.
    fn throttle(self, duration: Duration) -> Throttle<Self>
    where
        Self: Sized,
    {
        Throttle::new(self, duration)
    }
}

impl<T: Stream> ThrottleExt for T {}

pin_project! {
    /// A stream combinator that throttles emission rate
    pub struct Throttle<S: Stream> {
        #[pin]
        stream: S,
        interval: Interval,
        pending: Option<S::Item>,
        exhausted: bool,
    }
}

impl<S: Stream> Throttle<S> {
    /// Create a new throttled stream
    pub fn new(stream: S, duration: Duration) -> Self {
        let mut interval = interval(duration);
        // Don't burst after a stall
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self { stream, interval, pending: None, exhausted: false }
    }
}

impl<S: Stream> Stream for Throttle<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // Drain whatever is ready, keeping only the newest
        while !*this.exhausted {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => *this.pending = Some(item),
                Poll::Ready(None) => *this.exhausted = true,
                Poll::Pending => break,
            }
        }

        if this.pending.is_none() {
            // Inner stream registered the waker if it is still live
            return if *this.exhausted { Poll::Ready(None) } else { Poll::Pending };
        }

        ready!(this.interval.poll_tick(cx));
        Poll::Ready(this.pending.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    #[tokio::test(start_paused = true)]
    async fn keeps_only_latest_within_interval() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut throttled = Box::pin(UnboundedReceiverStream::new(rx).throttle(Duration::from_millis(100)));

        tx.send(1).unwrap();
        // First tick is immediate
        assert_eq!(throttled.next().await, Some(1));

        for value in 2..=5 {
            tx.send(value).unwrap();
        }
        assert_eq!(throttled.next().await, Some(5));

        tx.send(6).unwrap();
        drop(tx);
        assert_eq!(throttled.next().await, Some(6));
        assert_eq!(throttled.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_instead_of_ending_when_idle() {
        let (tx, rx) = mpsc::unbounded_channel::<u32>();
        let mut throttled = Box::pin(UnboundedReceiverStream::new(rx).throttle(Duration::from_millis(10)));

        let idle = tokio::time::timeout(Duration::from_millis(50), throttled.next()).await;
        assert!(idle.is_err(), "an idle source must not end the stream");

        tx.send(7).unwrap();
        assert_eq!(throttled.next().await, Some(7));
    }
}
