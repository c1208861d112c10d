//! Snapshot subscriptions for view-layer consumers.

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::state::SessionSnapshot;

/// A live subscription to session snapshots.
///
/// The session publishes a new snapshot only when a field changed, so every
/// wake-up of [`changed`](Self::changed) carries a real transition. Intermediate
/// snapshots may be coalesced if the consumer is slower than the session; the
/// latest one is never lost.
pub struct SessionSubscription {
    rx: watch::Receiver<SessionSnapshot>,
}

impl SessionSubscription {
    pub(crate) fn new(rx: watch::Receiver<SessionSnapshot>) -> Self {
        Self { rx }
    }

    /// Returns the latest snapshot without waiting.
    pub fn current(&self) -> SessionSnapshot {
        self.rx.borrow().clone()
    }

    /// Waits for the next change and returns the new snapshot.
    ///
    /// Returns `None` once the session has been dropped.
    pub async fn changed(&mut self) -> Option<SessionSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Waits until a snapshot satisfies `predicate`, checking the current one first.
    ///
    /// Returns `None` if the session is dropped before that happens.
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Option<SessionSnapshot> {
        self.rx
            .wait_for(|snapshot| predicate(snapshot))
            .await
            .ok()
            .map(|snapshot| (*snapshot).clone())
    }

    /// Ends the subscription.
    pub fn unsubscribe(self) {}

    /// Converts the subscription into a stream that yields the current
    /// snapshot first and then every change.
    pub fn into_stream(self) -> WatchStream<SessionSnapshot> {
        WatchStream::new(self.rx)
    }
}
