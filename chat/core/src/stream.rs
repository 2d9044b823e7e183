//! Stream Reducer
//!
//! Folds the incremental events of one generation request into the
//! conversation store.
//!
//! # Fold Rule
//!
//! ```text
//! tail is assistant  ──► append delta to tail in place (timestamp kept)
//! anything else      ──► push new visible assistant message = delta
//! end                ──► no mutation
//! ```
//!
//! `Error` events follow the text rule: their payload becomes reply text.
//! "Anything else" covers both the normal first chunk (tail is the user
//! message) and a transcript the host emptied mid-stream, where the next
//! chunk simply opens a fresh reply.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::messages::{Author, Message, MessageId};
use crate::store::ConversationStore;

/// Event payload as delivered by the generation service
///
/// Either bare text or a structured `{code, message}` object, where `code`
/// may be any JSON value. Anything else is carried verbatim and
/// stringified when folded, unless it is an object with a string
/// `message` field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// Plain text chunk
    Text(String),
    /// Structured payload (typically an error report)
    Structured {
        /// Service-specific code (string or number, depending on service)
        #[serde(default)]
        code: Option<serde_json::Value>,
        /// Human-readable text
        message: String,
    },
    /// Any other JSON value
    Other(serde_json::Value),
}

impl Payload {
    /// Structured payload constructor
    pub fn structured(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Structured {
            code: Some(serde_json::Value::String(code.into())),
            message: message.into(),
        }
    }

    /// Normalize to the text that lands in the transcript
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Structured { message, .. } => message,
            Self::Other(serde_json::Value::Object(mut map)) => match map.remove("message") {
                Some(serde_json::Value::String(message)) => message,
                Some(other) => {
                    map.insert("message".to_string(), other);
                    serde_json::Value::Object(map).to_string()
                }
                None => serde_json::Value::Object(map).to_string(),
            },
            Self::Other(value) => value.to_string(),
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// One event of a generation stream
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A chunk of generated text
    Data(Payload),
    /// A service-side error, surfaced as reply text
    Error(Payload),
    /// The stream finished
    End,
}

impl StreamEvent {
    /// Text chunk
    pub fn data(payload: impl Into<Payload>) -> Self {
        Self::Data(payload.into())
    }

    /// Error report
    pub fn error(payload: impl Into<Payload>) -> Self {
        Self::Error(payload.into())
    }

    /// Short name for logging
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Data(_) => EventKind::Data,
            Self::Error(_) => EventKind::Error,
            Self::End => EventKind::End,
        }
    }
}

/// Discriminant of a [`StreamEvent`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// Text chunk
    Data,
    /// Error report
    Error,
    /// Completion
    End,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data => write!(f, "data"),
            Self::Error => write!(f, "error"),
            Self::End => write!(f, "end"),
        }
    }
}

/// What a single fold did to the store
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FoldOutcome {
    /// A new assistant message was created
    Opened(MessageId),
    /// Text was appended to the open assistant message
    Extended(MessageId),
    /// Completion signal; nothing was mutated
    Ended,
}

impl FoldOutcome {
    /// The message touched by this fold, if any
    #[must_use]
    pub fn message_id(&self) -> Option<&MessageId> {
        match self {
            Self::Opened(id) | Self::Extended(id) => Some(id),
            Self::Ended => None,
        }
    }
}

/// Folds stream events into a conversation store
///
/// Holds the store *handle*, not a copy: every event reads the tail that
/// is current at delivery time.
#[derive(Debug)]
pub struct StreamReducer {
    store: ConversationStore,
    /// Events folded since creation
    folded: usize,
    /// Bytes of text folded since creation
    folded_bytes: usize,
}

impl StreamReducer {
    /// Create a reducer over a store handle
    #[must_use]
    pub fn new(store: ConversationStore) -> Self {
        Self {
            store,
            folded: 0,
            folded_bytes: 0,
        }
    }

    /// Fold one event
    pub fn apply(&mut self, event: StreamEvent) -> FoldOutcome {
        let kind = event.kind();
        let text = match event {
            StreamEvent::Data(payload) => payload.into_text(),
            StreamEvent::Error(payload) => {
                let text = payload.into_text();
                tracing::debug!(len = text.len(), "Folding stream error as reply text");
                text
            }
            StreamEvent::End => return FoldOutcome::Ended,
        };

        self.folded = self.folded.saturating_add(1);
        self.folded_bytes = self.folded_bytes.saturating_add(text.len());

        let outcome = fold_text(&self.store, text);
        tracing::debug!(kind = %kind, outcome = ?outcome, "Folded stream event");
        outcome
    }

    /// Number of text-bearing events folded
    #[must_use]
    pub fn folded(&self) -> usize {
        self.folded
    }

    /// Bytes of text folded
    #[must_use]
    pub fn folded_bytes(&self) -> usize {
        self.folded_bytes
    }

    /// The store this reducer writes to
    #[must_use]
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }
}

/// Decide-and-mutate under one store lock
fn fold_text(store: &ConversationStore, text: String) -> FoldOutcome {
    store.mutate(|messages| match messages.last_mut() {
        Some(open) if open.author == Author::Assistant => {
            open.append(&text);
            FoldOutcome::Extended(open.id.clone())
        }
        _ => {
            let reply = Message::assistant(text);
            let id = reply.id.clone();
            messages.push(reply);
            FoldOutcome::Opened(id)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::ClockTime;
    use pretty_assertions::assert_eq;

    fn store_with_user(text: &str) -> ConversationStore {
        let store = ConversationStore::new();
        store.append(Message::user(text));
        store
    }

    #[test]
    fn test_first_chunk_opens_reply() {
        let store = store_with_user("hi");
        let mut reducer = StreamReducer::new(store.clone());

        let outcome = reducer.apply(StreamEvent::data("Hel"));
        assert!(matches!(outcome, FoldOutcome::Opened(_)));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].author, Author::Assistant);
        assert_eq!(snapshot[1].text, "Hel");
        assert!(snapshot[1].visible);
    }

    #[test]
    fn test_chunks_append_in_place() {
        let store = store_with_user("hi");
        let mut reducer = StreamReducer::new(store.clone());

        let opened = reducer.apply(StreamEvent::data("Hel"));
        let extended = reducer.apply(StreamEvent::data("lo"));
        reducer.apply(StreamEvent::data(" there"));

        assert_eq!(opened.message_id(), extended.message_id());
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].text, "Hello there");
        assert_eq!(reducer.folded(), 3);
        assert_eq!(reducer.folded_bytes(), 11);
    }

    #[test]
    fn test_fold_counters_saturate() {
        let store = store_with_user("hi");
        let mut reducer = StreamReducer::new(store.clone());
        reducer.folded = usize::MAX;
        reducer.folded_bytes = usize::MAX - 1;

        reducer.apply(StreamEvent::data("more"));

        assert_eq!(reducer.folded(), usize::MAX);
        assert_eq!(reducer.folded_bytes(), usize::MAX);
        assert_eq!(store.snapshot()[1].text, "more");
    }

    #[test]
    fn test_append_does_not_refresh_timestamp() {
        let store = store_with_user("hi");
        store.append(Message::assistant("a").with_created_at(ClockTime::new(3, 7)));
        let mut reducer = StreamReducer::new(store.clone());

        reducer.apply(StreamEvent::data("b"));
        let snapshot = store.snapshot();
        assert_eq!(snapshot[1].text, "ab");
        assert_eq!(snapshot[1].created_at, ClockTime::new(3, 7));
    }

    #[test]
    fn test_error_folds_as_text() {
        let store = store_with_user("hi");
        let mut reducer = StreamReducer::new(store.clone());

        reducer.apply(StreamEvent::data("Hi"));
        reducer.apply(StreamEvent::error(Payload::structured("E1", " (retrying)")));
        assert_eq!(reducer.apply(StreamEvent::End), FoldOutcome::Ended);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].text, "Hi (retrying)");
    }

    #[test]
    fn test_error_as_first_event_opens_reply() {
        let store = store_with_user("hi");
        let mut reducer = StreamReducer::new(store.clone());

        reducer.apply(StreamEvent::error("quota exceeded"));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].author, Author::Assistant);
        assert_eq!(snapshot[1].text, "quota exceeded");
    }

    #[test]
    fn test_end_does_not_mutate() {
        let store = store_with_user("hi");
        let before = store.revision();
        let mut reducer = StreamReducer::new(store.clone());

        reducer.apply(StreamEvent::End);
        assert_eq!(store.revision(), before);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_emptied_store_opens_new_reply() {
        let store = store_with_user("hi");
        let mut reducer = StreamReducer::new(store.clone());
        reducer.apply(StreamEvent::data("partial"));

        store.replace_all(Vec::new());
        let outcome = reducer.apply(StreamEvent::data("rest"));

        assert!(matches!(outcome, FoldOutcome::Opened(_)));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].text, "rest");
    }

    #[test]
    fn test_payload_normalization() {
        assert_eq!(Payload::from("plain").into_text(), "plain");
        assert_eq!(Payload::structured("E1", "boom").into_text(), "boom");
        assert_eq!(Payload::Other(serde_json::json!(42)).into_text(), "42");
    }

    #[test]
    fn test_payload_deserialize() {
        let text: Payload = serde_json::from_str("\"chunk\"").unwrap();
        assert_eq!(text, Payload::Text("chunk".to_string()));

        let structured: Payload =
            serde_json::from_str(r#"{"code":"E1","message":" (retrying)"}"#).unwrap();
        assert_eq!(structured.into_text(), " (retrying)");

        let other: Payload = serde_json::from_str(r#"{"status":503}"#).unwrap();
        assert_eq!(other.into_text(), r#"{"status":503}"#);
    }

    #[test]
    fn test_numeric_code_still_structured() {
        let payload: Payload = serde_json::from_str(r#"{"code":500,"message":"boom"}"#).unwrap();
        assert!(matches!(payload, Payload::Structured { .. }));
        assert_eq!(payload.into_text(), "boom");
    }

    #[test]
    fn test_object_with_message_normalizes() {
        let payload = Payload::Other(serde_json::json!({"code": 500, "message": "boom"}));
        assert_eq!(payload.into_text(), "boom");

        let nested = Payload::Other(serde_json::json!({"message": {"detail": "x"}}));
        assert_eq!(nested.into_text(), r#"{"message":{"detail":"x"}}"#);
    }

    #[test]
    fn test_event_wire_shape() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"kind":"data","payload":"Hel"}"#).unwrap();
        assert_eq!(event, StreamEvent::data("Hel"));

        let end: StreamEvent = serde_json::from_str(r#"{"kind":"end"}"#).unwrap();
        assert_eq!(end, StreamEvent::End);
    }
}
