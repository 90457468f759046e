// ── Observable views ──
//
// Subscription type shared by the connection state, peer list and status
// views. Observers always receive the full current value, never deltas.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// A subscription to one observable value.
///
/// Provides point-in-time access and change notification via `changed()`,
/// or a `Stream` via `into_stream()`.
pub struct ViewStream<T: Clone + Send + Sync + 'static> {
    current: T,
    receiver: watch::Receiver<T>,
}

impl<T: Clone + Send + Sync + 'static> ViewStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<T>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The value captured at creation or at the last `changed()`.
    pub fn current(&self) -> &T {
        &self.current
    }

    /// The latest value, which may be newer than `current()`.
    pub fn latest(&self) -> T {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change and return the new value.
    /// Returns `None` once the coordinator has gone away.
    pub async fn changed(&mut self) -> Option<T> {
        self.receiver.changed().await.ok()?;
        let value = self.receiver.borrow_and_update().clone();
        self.current = value.clone();
        Some(value)
    }

    /// Convert into a `Stream`. The first item is the current value.
    pub fn into_stream(self) -> ViewWatchStream<T> {
        ViewWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct ViewWatchStream<T: Clone + Send + Sync + 'static> {
    inner: WatchStream<T>,
}

impl<T: Clone + Send + Sync + 'static> Stream for ViewWatchStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio_stream::StreamExt;

    use super::*;

    #[tokio::test]
    async fn changed_tracks_latest_value() {
        let (tx, rx) = watch::channel(1_u32);
        let mut view = ViewStream::new(rx);
        assert_eq!(*view.current(), 1);

        tx.send_replace(2);
        assert_eq!(view.latest(), 2);
        assert_eq!(*view.current(), 1);
        assert_eq!(view.changed().await, Some(2));
        assert_eq!(*view.current(), 2);

        drop(tx);
        assert_eq!(view.changed().await, None);
    }

    #[tokio::test]
    async fn stream_yields_current_then_updates() {
        let (tx, rx) = watch::channel("a");
        let mut stream = ViewStream::new(rx).into_stream();
        assert_eq!(stream.next().await, Some("a"));
        tx.send_replace("b");
        assert_eq!(stream.next().await, Some("b"));
    }
}
