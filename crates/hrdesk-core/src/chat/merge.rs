//! Snapshot merge engine and new-message detection.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use super::message::ChatMessage;

/// Merges id-keyed snapshot batches into one deduplicated, ordered sequence.
///
/// The merger is independent of how many underlying streams feed it: the
/// legacy two-direction-query shape and the per-conversation-query shape
/// both reduce to "apply a batch, read the merged view". For a given id the
/// last applied record wins; ordering is by resolved timestamp ascending,
/// unresolved timestamps last, ties broken by first-arrival order so that
/// re-delivering an unchanged snapshot never reorders anything.
#[derive(Debug, Default)]
pub struct MessageMerger {
    entries: HashMap<String, MergedEntry>,
    next_seq: u64,
}

#[derive(Debug)]
struct MergedEntry {
    seq: u64,
    message: ChatMessage,
}

impl MessageMerger {
    /// Creates an empty merger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all merged state, e.g. when the selected conversation changes.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.next_seq = 0;
    }

    /// Merges one snapshot batch and returns the full ordered view.
    pub fn apply(&mut self, batch: Vec<ChatMessage>) -> Vec<ChatMessage> {
        for message in batch {
            match self.entries.entry(message.id.clone()) {
                Entry::Occupied(mut occupied) => {
                    // Overwrite by id, keep the original arrival order
                    occupied.get_mut().message = message;
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(MergedEntry {
                        seq: self.next_seq,
                        message,
                    });
                    self.next_seq += 1;
                }
            }
        }
        self.ordered()
    }

    /// The current merged view, ordered.
    pub fn ordered(&self) -> Vec<ChatMessage> {
        let mut entries: Vec<&MergedEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| {
            compare_timestamps(&a.message, &b.message).then(a.seq.cmp(&b.seq))
        });
        entries.iter().map(|entry| entry.message.clone()).collect()
    }

    /// Number of distinct messages merged so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been merged yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn compare_timestamps(a: &ChatMessage, b: &ChatMessage) -> Ordering {
    match (a.timestamp, b.timestamp) {
        (Some(a), Some(b)) => a.cmp(&b),
        // Pending messages were "just sent" and belong at the end
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Tracks result-set growth across snapshots of one subscription.
///
/// The first snapshot is the initial history load and never counts as
/// growth; afterwards, growth means the count exceeded the prior stable
/// snapshot's count.
#[derive(Debug)]
pub struct SnapshotGrowth {
    first_snapshot: bool,
    prev_count: usize,
}

impl SnapshotGrowth {
    /// Creates a tracker in its pre-first-snapshot state.
    pub fn new() -> Self {
        Self {
            first_snapshot: true,
            prev_count: 0,
        }
    }

    /// Observes one snapshot's count and reports whether it grew.
    pub fn observe(&mut self, count: usize) -> bool {
        let first = self.first_snapshot;
        let grew = count > self.prev_count;
        self.first_snapshot = false;
        self.prev_count = count;
        !first && grew
    }

    /// Resets to the pre-first-snapshot state.
    pub fn reset(&mut self) {
        self.first_snapshot = true;
        self.prev_count = 0;
    }
}

impl Default for SnapshotGrowth {
    fn default() -> Self {
        Self::new()
    }
}

/// Decides when a merged update warrants a "new message" notification.
///
/// Notifies only when the message count grew, the newest message was not
/// sent by the local identity, and the snapshot is not the first one after
/// subscribing (initial history must never notify).
#[derive(Debug)]
pub struct NewMessageDetector {
    local_sender_id: String,
    growth: SnapshotGrowth,
}

impl NewMessageDetector {
    /// Creates a detector for the given local sender identity.
    pub fn new(local_sender_id: impl Into<String>) -> Self {
        Self {
            local_sender_id: local_sender_id.into(),
            growth: SnapshotGrowth::new(),
        }
    }

    /// Observes one merged view.
    ///
    /// # Returns
    ///
    /// The counterpart sender id when the update should notify, `None`
    /// otherwise.
    pub fn observe(&mut self, messages: &[ChatMessage]) -> Option<String> {
        if !self.growth.observe(messages.len()) {
            return None;
        }
        let newest = messages.last()?;
        if newest.is_from(&self.local_sender_id) {
            return None;
        }
        Some(newest.sender_id.clone())
    }

    /// Resets to the pre-first-snapshot state.
    pub fn reset(&mut self) {
        self.growth.reset();
    }
}
