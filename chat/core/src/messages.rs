//! Transcript Records
//!
//! The unit of the conversation transcript and its identifiers.
//!
//! # Design Philosophy
//!
//! A `Message` is plain data. It knows how to grow its own text but never
//! decides *when* to grow; that decision belongs to the stream reducer.
//! User messages are frozen at creation, assistant messages grow in place
//! while their turn is open.

use std::fmt;

use chrono::Timelike;
use serde::{Deserialize, Serialize};

/// Message identifier
///
/// A UUID v4 rendered as a string. Never reused for the lifetime of a
/// process, which makes it safe as a render key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who wrote a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    /// Text typed (or seeded) on the host side
    User,
    /// Text produced by the generation service
    Assistant,
}

impl Author {
    /// Whether this is the user side of the exchange
    #[must_use]
    pub fn is_user(self) -> bool {
        matches!(self, Self::User)
    }
}

/// Wall-clock time of day, minute resolution
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockTime {
    /// Hour of day (0-23)
    pub hour: u8,
    /// Minute of hour (0-59)
    pub minute: u8,
}

impl ClockTime {
    /// Create a clock time, wrapping out-of-range values
    #[must_use]
    pub fn new(hour: u8, minute: u8) -> Self {
        Self {
            hour: hour % 24,
            minute: minute % 60,
        }
    }

    /// Capture the current local time
    #[must_use]
    pub fn now() -> Self {
        let now = chrono::Local::now();
        Self::new(
            u8::try_from(now.hour()).unwrap_or_default(),
            u8::try_from(now.minute()).unwrap_or_default(),
        )
    }
}

impl fmt::Display for ClockTime {
    /// `H:MM`: hour unpadded, minute zero-padded
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.hour, self.minute)
    }
}

/// A record in the conversation transcript
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: MessageId,
    /// Who wrote this message
    pub author: Author,
    /// Message text (append-only while streaming)
    pub text: String,
    /// Whether renderers should show this message
    pub visible: bool,
    /// When the message was created; not refreshed by appends
    pub created_at: ClockTime,
}

impl Message {
    /// Create a visible user message
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Author::User, text.into(), true)
    }

    /// Create a hidden user message
    ///
    /// Hidden messages still take part in the exchange (they drive a
    /// reply) but are excluded from the rendered transcript.
    pub fn hidden_user(text: impl Into<String>) -> Self {
        Self::new(Author::User, text.into(), false)
    }

    /// Create a visible assistant message holding the first chunk of a reply
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Author::Assistant, text.into(), true)
    }

    fn new(author: Author, text: String, visible: bool) -> Self {
        Self {
            id: MessageId::new(),
            author,
            text,
            visible,
            created_at: ClockTime::now(),
        }
    }

    /// Override the creation time
    #[must_use]
    pub fn with_created_at(mut self, created_at: ClockTime) -> Self {
        self.created_at = created_at;
        self
    }

    /// Append streamed text in place
    pub(crate) fn append(&mut self, text: &str) {
        self.text.push_str(text);
    }
}
