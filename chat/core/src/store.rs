//! Conversation Store
//!
//! The ordered transcript shared between the host application and the
//! engine.
//!
//! # Design Philosophy
//!
//! The store is a *handle*: cloning it yields another view of the same
//! transcript, never a copy. Long-lived consumers (the stream fold, a
//! renderer task) therefore always observe the current sequence, including
//! a sequence the host replaced wholesale mid-stream.
//!
//! Every mutation, including in-place text growth of the open reply, bumps
//! a revision counter published on a `tokio::sync::watch` channel so
//! readers re-render on text-length change and not only on insertion.
//!
//! A single `parking_lot::Mutex` serializes mutations. The engine is driven
//! from one logical task, so the lock is uncontended in practice.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::messages::{Author, Message, MessageId};

/// Monotonic change counter for the transcript
pub type Revision = u64;

/// Shared handle to an ordered message sequence
#[derive(Clone)]
pub struct ConversationStore {
    messages: Arc<Mutex<Vec<Message>>>,
    revision: Arc<watch::Sender<Revision>>,
}

impl ConversationStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::from_messages(Vec::new())
    }

    /// Create a store pre-populated by the host
    #[must_use]
    pub fn from_messages(messages: Vec<Message>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            messages: Arc::new(Mutex::new(messages)),
            revision: Arc::new(revision),
        }
    }

    /// Place a record at the tail
    pub fn append(&self, message: Message) -> MessageId {
        let id = message.id.clone();
        self.mutate(|messages| messages.push(message));
        id
    }

    /// Replace the whole sequence
    ///
    /// An in-flight stream keeps folding into whatever sequence is current
    /// when its next event arrives.
    pub fn replace_all(&self, messages: Vec<Message>) {
        let count = messages.len();
        self.mutate(|current| *current = messages);
        tracing::debug!(count, "Replaced transcript");
    }

    /// Owned copy of the current sequence
    #[must_use]
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    /// Read the current sequence without cloning it
    pub fn read<R>(&self, f: impl FnOnce(&[Message]) -> R) -> R {
        f(&self.messages.lock())
    }

    /// Look up a message by ID
    #[must_use]
    pub fn get(&self, id: &MessageId) -> Option<Message> {
        self.messages.lock().iter().find(|m| &m.id == id).cloned()
    }

    /// Author of the last record, if any
    #[must_use]
    pub fn tail_author(&self) -> Option<Author> {
        self.messages.lock().last().map(|m| m.author)
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    /// Whether the transcript is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// Current revision
    #[must_use]
    pub fn revision(&self) -> Revision {
        *self.revision.borrow()
    }

    /// Subscribe to revision changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Revision> {
        self.revision.subscribe()
    }

    /// Run a mutation under the store lock and publish a new revision
    ///
    /// The lock is released before subscribers are woken.
    pub(crate) fn mutate<R>(&self, f: impl FnOnce(&mut Vec<Message>) -> R) -> R {
        let result = {
            let mut messages = self.messages.lock();
            f(&mut messages)
        };
        self.revision.send_modify(|rev| *rev += 1);
        result
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("len", &self.len())
            .field("revision", &self.revision())
            .finish()
    }
}
