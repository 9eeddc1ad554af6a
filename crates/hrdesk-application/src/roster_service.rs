//! Employee roster service.
//!
//! Keeps the employee list and the dashboard fed from the live feedback
//! collection: every snapshot becomes a decoded roster update, and growth
//! after the initial load raises a notification.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use hrdesk_core::chat::SnapshotGrowth;
use hrdesk_core::config::PanelConfig;
use hrdesk_core::directory::RosterEvent;
use hrdesk_core::error::Result;
use hrdesk_core::store::{DocumentStore, Query, schema};

/// Streams the feedback roster to the presentation layer.
///
/// The roster starts in a loading state; the first delivered snapshot ends
/// it. The first snapshot never raises a `NewFeedback` notification, no
/// matter how many records it carries.
pub struct RosterService {
    store: Arc<dyn DocumentStore>,
    config: PanelConfig,
    events: mpsc::Sender<RosterEvent>,
    loading: AtomicBool,
}

impl RosterService {
    /// Creates a roster service over the given store.
    ///
    /// # Returns
    ///
    /// The service and the receiving half of its event channel.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        config: PanelConfig,
    ) -> (Self, mpsc::Receiver<RosterEvent>) {
        let capacity = config.store.event_channel_capacity.max(1);
        let (events, events_rx) = mpsc::channel(capacity);
        (
            Self {
                store,
                config,
                events,
                loading: AtomicBool::new(true),
            },
            events_rx,
        )
    }

    /// Returns true until the first snapshot has been delivered.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Pumps roster snapshots until cancelled or the store side closes.
    ///
    /// # Errors
    ///
    /// Returns an error if the feedback subscription cannot be opened; the
    /// caller surfaces it as a transient notification and may retry.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let query = Query::collection(self.config.store.feedback_collection.clone())
            .order_by(schema::fields::DATE);
        let mut subscription = self.store.subscribe(query).await.inspect_err(|err| {
            error!("[RosterService] subscribe to feedback failed: {err}");
        })?;

        let mut growth = SnapshotGrowth::new();
        loop {
            let snapshot = tokio::select! {
                _ = cancel.cancelled() => break,
                received = subscription.recv() => match received {
                    Some(snapshot) => snapshot,
                    None => break,
                },
            };
            let records = schema::decode_feedback_records(&snapshot);
            let grew = growth.observe(records.len());
            self.loading.store(false, Ordering::SeqCst);
            debug!("[RosterService] roster snapshot with {} records", records.len());

            if self
                .events
                .send(RosterEvent::RosterUpdated { records })
                .await
                .is_err()
            {
                warn!("[RosterService] event receiver dropped");
                break;
            }
            if grew && self.events.send(RosterEvent::NewFeedback).await.is_err() {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;
    use tokio::time::timeout;

    use hrdesk_core::store::{DocumentPath, WriteFields, WriteOp};
    use hrdesk_infrastructure::InMemoryDocumentStore;

    fn feedback_fields(name: &str, score: i64) -> WriteFields {
        WriteFields::new()
            .set(schema::fields::EMPLOYEE_NAME, name)
            .set(schema::fields::SCORE, score)
            .server_timestamp(schema::fields::DATE)
    }

    async fn seed_feedback(store: &InMemoryDocumentStore, id: &str, name: &str, score: i64) {
        store
            .commit(vec![WriteOp::Create {
                path: DocumentPath::new("feedback", id),
                fields: feedback_fields(name, score),
            }])
            .await
            .unwrap();
    }

    async fn next_event(events: &mut mpsc::Receiver<RosterEvent>) -> RosterEvent {
        timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    async fn assert_silent(events: &mut mpsc::Receiver<RosterEvent>) {
        let quiet = timeout(Duration::from_millis(200), events.recv()).await;
        assert!(quiet.is_err(), "expected no event, got {quiet:?}");
    }

    fn start(
        store: Arc<InMemoryDocumentStore>,
    ) -> (
        Arc<RosterService>,
        mpsc::Receiver<RosterEvent>,
        CancellationToken,
    ) {
        let (service, events) = RosterService::new(store, PanelConfig::default());
        let service = Arc::new(service);
        let cancel = CancellationToken::new();
        {
            let service = service.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { service.run(cancel).await });
        }
        (service, events, cancel)
    }

    #[tokio::test]
    async fn test_first_snapshot_loads_without_notifying() {
        let store = Arc::new(InMemoryDocumentStore::new());
        seed_feedback(&store, "emp-1", "Jane Doe", 5).await;
        seed_feedback(&store, "emp-2", "Bob Reyes", 3).await;

        let (service, mut events, _cancel) = start(store);
        assert!(service.is_loading());

        match next_event(&mut events).await {
            RosterEvent::RosterUpdated { records } => {
                assert_eq!(records.len(), 2);
                assert_eq!(records[0].employee_name, "Jane Doe");
            }
            other => panic!("expected RosterUpdated, got {other:?}"),
        }
        assert!(!service.is_loading());
        assert_silent(&mut events).await;
    }

    #[tokio::test]
    async fn test_growth_after_first_snapshot_notifies() {
        let store = Arc::new(InMemoryDocumentStore::new());
        seed_feedback(&store, "emp-1", "Jane Doe", 5).await;

        let (_service, mut events, _cancel) = start(store.clone());
        assert!(matches!(
            next_event(&mut events).await,
            RosterEvent::RosterUpdated { .. }
        ));

        seed_feedback(&store, "emp-2", "Bob Reyes", 4).await;

        match next_event(&mut events).await {
            RosterEvent::RosterUpdated { records } => assert_eq!(records.len(), 2),
            other => panic!("expected RosterUpdated, got {other:?}"),
        }
        assert!(matches!(next_event(&mut events).await, RosterEvent::NewFeedback));
    }

    #[tokio::test]
    async fn test_malformed_records_are_dropped_not_fatal() {
        let store = Arc::new(InMemoryDocumentStore::new());
        seed_feedback(&store, "emp-1", "Jane Doe", 5).await;

        let (_service, mut events, _cancel) = start(store.clone());
        assert!(matches!(
            next_event(&mut events).await,
            RosterEvent::RosterUpdated { .. }
        ));

        // No employeeName: decodes to nothing, roster count stays flat
        store
            .commit(vec![WriteOp::Create {
                path: DocumentPath::new("feedback", "broken"),
                fields: WriteFields::new().set("payload", json!({"unexpected": true})),
            }])
            .await
            .unwrap();

        match next_event(&mut events).await {
            RosterEvent::RosterUpdated { records } => {
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].id, "emp-1");
            }
            other => panic!("expected RosterUpdated, got {other:?}"),
        }
        // Flat count means no notification
        assert_silent(&mut events).await;
    }

    #[tokio::test]
    async fn test_cancellation_stops_the_stream() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let (_service, mut events, cancel) = start(store.clone());
        assert!(matches!(
            next_event(&mut events).await,
            RosterEvent::RosterUpdated { .. }
        ));

        cancel.cancel();
        // Give the pump a beat to wind down, then write
        tokio::time::sleep(Duration::from_millis(50)).await;
        seed_feedback(&store, "emp-9", "Late Arrival", 2).await;

        assert_silent(&mut events).await;
    }
}
