//! Chat session service.
//!
//! Drives the conversation view: resolves the selected employee to a
//! conversation, keeps one live message subscription per selection, merges
//! snapshots into the ordered view, and commits outbound messages together
//! with the conversation preview as one atomic batch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use uuid::Uuid;

use hrdesk_core::chat::{ChatEvent, ConversationId, MessageMerger, NewMessageDetector};
use hrdesk_core::config::PanelConfig;
use hrdesk_core::error::{HrdeskError, Result};
use hrdesk_core::selection::{SelectedEmployee, SelectionWatcher};
use hrdesk_core::store::{DocumentPath, DocumentStore, Query, Subscription, WriteOp, schema};

/// Manages the chat view's conversation lifecycle.
///
/// `ChatService` is responsible for:
/// - Resolving a selected employee to a stable conversation id
/// - Ensuring the conversation record exists before anything else happens
/// - Opening, switching and tearing down the live message subscription
/// - Emitting view events (merged message lists, notifications, failures)
/// - Committing outbound messages atomically with the preview update
///
/// Events flow through the receiver returned by [`ChatService::new`]; the
/// presentation layer renders whatever arrives there and never reaches into
/// the service's state.
pub struct ChatService {
    store: Arc<dyn DocumentStore>,
    config: PanelConfig,
    events: mpsc::Sender<ChatEvent>,
    /// The conversation currently on screen, if any
    active: Mutex<Option<ActiveConversation>>,
    /// Guard rejecting re-entrant sends while one is in flight
    sending: AtomicBool,
}

struct ActiveConversation {
    conversation_id: ConversationId,
    employee: SelectedEmployee,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ChatService {
    /// Creates a chat service over the given store.
    ///
    /// # Returns
    ///
    /// The service and the receiving half of its event channel.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        config: PanelConfig,
    ) -> (Self, mpsc::Receiver<ChatEvent>) {
        let capacity = config.store.event_channel_capacity.max(1);
        let (events, events_rx) = mpsc::channel(capacity);
        (
            Self {
                store,
                config,
                events,
                active: Mutex::new(None),
                sending: AtomicBool::new(false),
            },
            events_rx,
        )
    }

    /// Follows the shared selection cell for the lifetime of the view.
    ///
    /// Applies the current selection immediately, then re-targets the
    /// subscription on every change. The selection cell must outlive the
    /// view driving this loop.
    pub async fn run(&self, mut selection: SelectionWatcher) {
        self.select_employee(selection.current()).await;
        loop {
            let next = selection.changed().await;
            self.select_employee(next).await;
        }
    }

    /// Switches the view to an employee, or to the empty state.
    ///
    /// Any previous subscription is torn down first and the rendered list
    /// is reset, so snapshots from the old conversation can never appear
    /// under the new one.
    pub async fn select_employee(&self, selection: Option<SelectedEmployee>) {
        self.teardown().await;
        self.emit(ChatEvent::MessagesUpdated {
            messages: Vec::new(),
        })
        .await;

        let Some(employee) = selection else {
            return;
        };
        let Some(conversation_id) = ConversationId::for_employee(&employee.employee_name) else {
            return;
        };
        debug!(
            "[ChatService] opening {conversation_id} for employee '{}'",
            employee.id
        );

        // A failed ensure must not strand the view; the subscription opens
        // regardless and the record appears on the first send instead
        if let Err(err) = self.ensure_conversation(&conversation_id, &employee).await {
            warn!("[ChatService] ensure {conversation_id} failed: {err}");
        }

        let query = Query::collection(
            conversation_id.messages_collection(&self.config.store.conversations_collection),
        )
        .order_by(schema::fields::TIMESTAMP);
        let subscription = match self.store.subscribe(query).await {
            Ok(subscription) => subscription,
            Err(err) => {
                error!("[ChatService] subscribe to {conversation_id} failed: {err}");
                self.emit(ChatEvent::SubscribeFailed {
                    reason: err.to_string(),
                })
                .await;
                return;
            }
        };

        let cancel = CancellationToken::new();
        let task = tokio::spawn(pump_messages(
            subscription,
            cancel.clone(),
            self.events.clone(),
            self.config.hr.sender_id.clone(),
        ));
        *self.active.lock().await = Some(ActiveConversation {
            conversation_id,
            employee,
            cancel,
            task,
        });
    }

    /// Sends a message to the active conversation.
    ///
    /// The text is trimmed first; an empty result or an empty selection is
    /// a silent no-op. The message record and the conversation preview are
    /// committed as one all-or-nothing batch.
    ///
    /// # Errors
    ///
    /// - [`HrdeskError::Busy`] when a send is already in flight
    /// - The store's error when the commit fails; a `SendFailed` event is
    ///   emitted as well, and the caller keeps the draft for retry
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let (conversation_id, employee) = {
            let active = self.active.lock().await;
            match active.as_ref() {
                Some(active) => (active.conversation_id.clone(), active.employee.clone()),
                None => return Ok(()),
            }
        };

        if self.sending.swap(true, Ordering::SeqCst) {
            return Err(HrdeskError::Busy("send"));
        }
        let result = self
            .commit_message(&conversation_id, &employee, text)
            .await;
        self.sending.store(false, Ordering::SeqCst);

        if let Err(err) = &result {
            warn!("[ChatService] send to {conversation_id} failed: {err}");
            self.emit(ChatEvent::SendFailed {
                reason: err.to_string(),
            })
            .await;
        }
        result
    }

    /// The id of the conversation currently on screen.
    pub async fn active_conversation_id(&self) -> Option<ConversationId> {
        let active = self.active.lock().await;
        active.as_ref().map(|active| active.conversation_id.clone())
    }

    async fn teardown(&self) {
        if let Some(previous) = self.active.lock().await.take() {
            debug!("[ChatService] closing {}", previous.conversation_id);
            previous.cancel.cancel();
            previous.task.abort();
        }
    }

    async fn ensure_conversation(
        &self,
        conversation_id: &ConversationId,
        employee: &SelectedEmployee,
    ) -> Result<()> {
        let participants = self.participant_names(employee);
        self.store
            .upsert_merge(
                conversation_id.doc_path(&self.config.store.conversations_collection),
                schema::participants_fields(&participants),
            )
            .await
    }

    async fn commit_message(
        &self,
        conversation_id: &ConversationId,
        employee: &SelectedEmployee,
        text: &str,
    ) -> Result<()> {
        let conversations = &self.config.store.conversations_collection;
        let message_path = DocumentPath::new(
            conversation_id.messages_collection(conversations),
            Uuid::new_v4().to_string(),
        );
        let participants = self.participant_names(employee);
        self.store
            .commit(vec![
                WriteOp::Create {
                    path: message_path,
                    fields: schema::message_fields(&self.config.hr.sender_id, text),
                },
                WriteOp::UpsertMerge {
                    path: conversation_id.doc_path(conversations),
                    fields: schema::conversation_preview(&participants, text),
                },
            ])
            .await
    }

    fn participant_names(&self, employee: &SelectedEmployee) -> Vec<String> {
        vec![
            self.config.hr.display_name.clone(),
            employee.employee_name.clone(),
        ]
    }

    async fn emit(&self, event: ChatEvent) {
        if self.events.send(event).await.is_err() {
            warn!("[ChatService] event receiver dropped");
        }
    }
}

impl Drop for ChatService {
    /// Discarding the view cancels its subscription; nothing may be
    /// delivered into a torn-down state.
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.try_lock()
            && let Some(previous) = active.take()
        {
            previous.cancel.cancel();
            previous.task.abort();
        }
    }
}

/// Pumps one subscription's snapshots into merged view updates.
///
/// Owns the per-subscription merge state; a new selection gets a fresh pump
/// with a fresh merger, so conversations never share merged state.
async fn pump_messages(
    mut subscription: Subscription,
    cancel: CancellationToken,
    events: mpsc::Sender<ChatEvent>,
    local_sender_id: String,
) {
    let mut merger = MessageMerger::new();
    let mut detector = NewMessageDetector::new(local_sender_id);
    loop {
        let snapshot = tokio::select! {
            _ = cancel.cancelled() => break,
            received = subscription.recv() => match received {
                Some(snapshot) => snapshot,
                None => break,
            },
        };
        let messages = merger.apply(schema::decode_messages(&snapshot));
        let notification = detector.observe(&messages);
        if cancel.is_cancelled() {
            // Nothing decoded after teardown may reach the view
            break;
        }
        if events
            .send(ChatEvent::MessagesUpdated { messages })
            .await
            .is_err()
        {
            break;
        }
        if let Some(sender_id) = notification
            && events.send(ChatEvent::NewMessage { sender_id }).await.is_err()
        {
            break;
        }
    }
}
