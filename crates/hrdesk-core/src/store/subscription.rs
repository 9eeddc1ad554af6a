//! Live snapshot stream handles.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::document::Document;

/// One delivered state of a live query's result set.
///
/// Snapshots carry the full current result set, already filtered and ordered
/// by the store. The merge layer treats them as id-keyed batches, so partial
/// deliveries from stores that only send changed documents merge identically.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Matching documents in query order.
    pub docs: Vec<Document>,
}

impl Snapshot {
    /// Creates a snapshot from a list of documents.
    pub fn new(docs: Vec<Document>) -> Self {
        Self { docs }
    }

    /// Number of documents in the snapshot.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Returns true if the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

/// Receiving half of a live query subscription.
///
/// Dropping the handle cancels the subscription; the store prunes its sending
/// half and no further snapshots are delivered. A snapshot that was already
/// queued when the subscription was cancelled is discarded, never returned.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<Snapshot>,
    cancel: CancellationToken,
}

impl Subscription {
    /// Creates a subscription handle from its channel and cancellation token.
    ///
    /// The store keeps the sending half and a clone of the token; cancelling
    /// either side tears the stream down.
    pub fn new(rx: mpsc::Receiver<Snapshot>, cancel: CancellationToken) -> Self {
        Self { rx, cancel }
    }

    /// Receives the next snapshot.
    ///
    /// # Returns
    ///
    /// `None` once the subscription is cancelled or the store side is gone.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            snapshot = self.rx.recv() => snapshot,
        }
    }

    /// Cancels the subscription.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns true if the subscription has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recv_returns_queued_snapshot() {
        let (tx, rx) = mpsc::channel(4);
        let mut subscription = Subscription::new(rx, CancellationToken::new());

        tx.send(Snapshot::new(vec![Document::new("m1")]))
            .await
            .unwrap();

        let snapshot = subscription.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.docs[0].id, "m1");
    }

    #[tokio::test]
    async fn test_cancelled_subscription_discards_queued_snapshots() {
        let (tx, rx) = mpsc::channel(4);
        let mut subscription = Subscription::new(rx, CancellationToken::new());

        tx.send(Snapshot::new(vec![Document::new("late")]))
            .await
            .unwrap();
        subscription.cancel();

        assert!(subscription.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_recv_ends_when_store_side_closes() {
        let (tx, rx) = mpsc::channel::<Snapshot>(4);
        let mut subscription = Subscription::new(rx, CancellationToken::new());

        drop(tx);

        assert!(subscription.recv().await.is_none());
    }
}
