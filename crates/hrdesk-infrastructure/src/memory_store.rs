//! In-memory realtime document store.
//!
//! Reference implementation of the core's `DocumentStore` contract, backing
//! tests and single-process deployments. Collections live under one lock;
//! every commit fans the affected queries' full result sets out to their
//! subscribers, so a subscription always converges on current state.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use async_trait::async_trait;
use hrdesk_core::error::{HrdeskError, Result};
use hrdesk_core::store::{
    Document, DocumentPath, DocumentStore, FieldValue, Query, Snapshot, Subscription, WriteFields,
    WriteOp,
};

/// Default buffer size of per-subscription snapshot channels.
const SNAPSHOT_BUFFER_SIZE: usize = 64;

/// In-memory document store with live query subscriptions.
///
/// Guarantees, per the store contract:
/// - `subscribe` delivers the full current result set immediately, then a
///   full snapshot after every commit touching the query's collection
/// - cancelled or dropped subscriptions are pruned and never hear again
/// - server-assigned timestamps are strictly monotonic across writes, and
///   every timestamp request inside one batch resolves to the same value
/// - `commit` validates every operation before applying any
pub struct InMemoryDocumentStore {
    state: Mutex<StoreState>,
    snapshot_capacity: usize,
}

#[derive(Default)]
struct StoreState {
    /// Collection name -> document id -> document
    collections: HashMap<String, BTreeMap<String, Document>>,
    /// Live query subscribers
    subscribers: Vec<Subscriber>,
    clock: ServerClock,
}

struct Subscriber {
    query: Query,
    tx: mpsc::Sender<Snapshot>,
    cancel: CancellationToken,
}

/// Clock assigning write timestamps, strictly monotonic in milliseconds.
#[derive(Default)]
struct ServerClock {
    last_millis: i64,
}

impl ServerClock {
    fn next(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let assigned = now.max(self.last_millis + 1);
        self.last_millis = assigned;
        assigned
    }
}

impl InMemoryDocumentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            snapshot_capacity: SNAPSHOT_BUFFER_SIZE,
        }
    }

    /// Overrides the per-subscription snapshot buffer size.
    pub fn with_snapshot_capacity(mut self, capacity: usize) -> Self {
        self.snapshot_capacity = capacity.max(1);
        self
    }

    /// Returns a document by path, if present.
    pub async fn get(&self, path: &DocumentPath) -> Option<Document> {
        let state = self.state.lock().await;
        state
            .collections
            .get(&path.collection)
            .and_then(|collection| collection.get(&path.id))
            .cloned()
    }

    /// Number of documents in a collection.
    pub async fn document_count(&self, collection: &str) -> usize {
        let state = self.state.lock().await;
        state
            .collections
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn subscribe(&self, query: Query) -> Result<Subscription> {
        let (tx, rx) = mpsc::channel(self.snapshot_capacity);
        let cancel = CancellationToken::new();

        let mut state = self.state.lock().await;
        let initial = state.run_query(&query);
        tx.try_send(initial)
            .map_err(|_| HrdeskError::store("snapshot channel rejected initial snapshot"))?;
        state.subscribers.push(Subscriber {
            query,
            tx,
            cancel: cancel.clone(),
        });

        Ok(Subscription::new(rx, cancel))
    }

    async fn upsert_merge(&self, path: DocumentPath, fields: WriteFields) -> Result<()> {
        self.commit(vec![WriteOp::UpsertMerge { path, fields }]).await
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<()> {
        let mut state = self.state.lock().await;

        state.validate(&ops)?;

        // One clock value per batch: a message and its preview update share
        // the same commit time
        let timestamp_millis = state.clock.next();
        let mut touched = HashSet::new();
        for op in ops {
            touched.insert(op.path().collection.clone());
            state.apply(op, timestamp_millis);
        }
        state.notify(&touched);

        Ok(())
    }
}

impl StoreState {
    fn validate(&self, ops: &[WriteOp]) -> Result<()> {
        let mut creating = HashSet::new();
        for op in ops {
            let path = op.path();
            if path.collection.is_empty() || path.id.is_empty() {
                return Err(HrdeskError::store("write path must name a collection and id"));
            }
            if let WriteOp::Create { .. } = op {
                let exists = self
                    .collections
                    .get(&path.collection)
                    .is_some_and(|collection| collection.contains_key(&path.id));
                if exists || !creating.insert(path.clone()) {
                    return Err(HrdeskError::store(format!(
                        "document already exists: {path}"
                    )));
                }
            }
        }
        Ok(())
    }

    fn apply(&mut self, op: WriteOp, timestamp_millis: i64) {
        let (path, fields) = match op {
            WriteOp::Create { path, fields } | WriteOp::UpsertMerge { path, fields } => {
                (path, fields)
            }
        };
        let document = self
            .collections
            .entry(path.collection)
            .or_default()
            .entry(path.id.clone())
            .or_insert_with(|| Document::new(path.id));
        for (name, value) in fields.iter() {
            let resolved = match value {
                FieldValue::Set(value) => value.clone(),
                FieldValue::ServerTimestamp => Value::from(timestamp_millis),
            };
            document.fields.insert(name.clone(), resolved);
        }
    }

    fn run_query(&self, query: &Query) -> Snapshot {
        let mut docs: Vec<Document> = self
            .collections
            .get(&query.collection)
            .map(|collection| {
                collection
                    .values()
                    .filter(|document| query.matches(document))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        query.sort(&mut docs);
        Snapshot::new(docs)
    }

    fn notify(&mut self, touched: &HashSet<String>) {
        self.subscribers
            .retain(|subscriber| !subscriber.cancel.is_cancelled() && !subscriber.tx.is_closed());

        for subscriber in &self.subscribers {
            if !touched.contains(&subscriber.query.collection) {
                continue;
            }
            let snapshot = self.run_query(&subscriber.query);
            match subscriber.tx.try_send(snapshot) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    // The next commit re-delivers full state, so a slow
                    // subscriber only lags, it never diverges
                    warn!(
                        "[InMemoryDocumentStore] subscriber buffer full for '{}'; dropping snapshot",
                        subscriber.query.collection
                    );
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_fields(sender: &str, text: &str) -> WriteFields {
        WriteFields::new()
            .set("senderId", sender)
            .set("text", text)
            .server_timestamp("timestamp")
    }

    #[tokio::test]
    async fn test_subscribe_delivers_current_state_first() {
        let store = InMemoryDocumentStore::new();
        store
            .commit(vec![WriteOp::Create {
                path: DocumentPath::new("messages", "m1"),
                fields: text_fields("HR", "hello"),
            }])
            .await
            .unwrap();

        let mut subscription = store
            .subscribe(Query::collection("messages").order_by("timestamp"))
            .await
            .unwrap();

        let initial = subscription.recv().await.unwrap();
        assert_eq!(initial.len(), 1);
        assert_eq!(initial.docs[0].id, "m1");
    }

    #[tokio::test]
    async fn test_commit_notifies_matching_subscribers() {
        let store = InMemoryDocumentStore::new();
        let mut subscription = store
            .subscribe(Query::collection("messages").order_by("timestamp"))
            .await
            .unwrap();
        assert!(subscription.recv().await.unwrap().is_empty());

        store
            .commit(vec![WriteOp::Create {
                path: DocumentPath::new("messages", "m1"),
                fields: text_fields("jane", "hi"),
            }])
            .await
            .unwrap();

        let updated = subscription.recv().await.unwrap();
        assert_eq!(updated.len(), 1);
    }

    #[tokio::test]
    async fn test_filters_scope_subscriptions() {
        let store = InMemoryDocumentStore::new();
        let mut hr_only = store
            .subscribe(Query::collection("messages").where_eq("senderId", "HR"))
            .await
            .unwrap();
        hr_only.recv().await.unwrap();

        store
            .commit(vec![
                WriteOp::Create {
                    path: DocumentPath::new("messages", "m1"),
                    fields: text_fields("HR", "ours"),
                },
                WriteOp::Create {
                    path: DocumentPath::new("messages", "m2"),
                    fields: text_fields("jane", "theirs"),
                },
            ])
            .await
            .unwrap();

        let snapshot = hr_only.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.docs[0].id, "m1");
    }

    #[tokio::test]
    async fn test_upsert_merge_leaves_unnamed_fields_untouched() {
        let store = InMemoryDocumentStore::new();
        let path = DocumentPath::new("conversations", "conv_jane");
        store
            .upsert_merge(
                path.clone(),
                WriteFields::new().set("lastMessage", "see you"),
            )
            .await
            .unwrap();

        store
            .upsert_merge(
                path.clone(),
                WriteFields::new().set("participantNames", Value::from(vec!["HR", "Jane"])),
            )
            .await
            .unwrap();

        let document = store.get(&path).await.unwrap();
        assert_eq!(
            document.field("lastMessage").and_then(Value::as_str),
            Some("see you")
        );
        assert!(document.field("participantNames").is_some());
    }

    #[tokio::test]
    async fn test_commit_is_all_or_nothing() {
        let store = InMemoryDocumentStore::new();
        let existing = DocumentPath::new("messages", "m1");
        store
            .commit(vec![WriteOp::Create {
                path: existing.clone(),
                fields: text_fields("HR", "first"),
            }])
            .await
            .unwrap();

        let result = store
            .commit(vec![
                WriteOp::UpsertMerge {
                    path: DocumentPath::new("conversations", "conv_jane"),
                    fields: WriteFields::new().set("lastMessage", "never lands"),
                },
                WriteOp::Create {
                    path: existing,
                    fields: text_fields("HR", "duplicate"),
                },
            ])
            .await;

        assert!(result.is_err());
        assert_eq!(store.document_count("conversations").await, 0);
    }

    #[tokio::test]
    async fn test_server_timestamps_increase_across_commits() {
        let store = InMemoryDocumentStore::new();
        for id in ["m1", "m2", "m3"] {
            store
                .commit(vec![WriteOp::Create {
                    path: DocumentPath::new("messages", id),
                    fields: text_fields("HR", id),
                }])
                .await
                .unwrap();
        }

        let mut previous = i64::MIN;
        for id in ["m1", "m2", "m3"] {
            let document = store.get(&DocumentPath::new("messages", id)).await.unwrap();
            let millis = document.field("timestamp").and_then(Value::as_i64).unwrap();
            assert!(millis > previous);
            previous = millis;
        }
    }

    #[tokio::test]
    async fn test_batch_shares_one_timestamp() {
        let store = InMemoryDocumentStore::new();
        store
            .commit(vec![
                WriteOp::Create {
                    path: DocumentPath::new("conversations/conv_jane/messages", "m1"),
                    fields: text_fields("HR", "hello"),
                },
                WriteOp::UpsertMerge {
                    path: DocumentPath::new("conversations", "conv_jane"),
                    fields: WriteFields::new()
                        .set("lastMessage", "hello")
                        .server_timestamp("lastMessageTimestamp"),
                },
            ])
            .await
            .unwrap();

        let message = store
            .get(&DocumentPath::new("conversations/conv_jane/messages", "m1"))
            .await
            .unwrap();
        let preview = store
            .get(&DocumentPath::new("conversations", "conv_jane"))
            .await
            .unwrap();
        assert_eq!(
            message.field("timestamp"),
            preview.field("lastMessageTimestamp")
        );
    }

    #[tokio::test]
    async fn test_cancelled_subscription_hears_nothing() {
        let store = InMemoryDocumentStore::new();
        let mut subscription = store
            .subscribe(Query::collection("messages"))
            .await
            .unwrap();
        subscription.recv().await.unwrap();

        subscription.cancel();
        store
            .commit(vec![WriteOp::Create {
                path: DocumentPath::new("messages", "late"),
                fields: text_fields("jane", "too late"),
            }])
            .await
            .unwrap();

        assert!(subscription.recv().await.is_none());
    }
}
