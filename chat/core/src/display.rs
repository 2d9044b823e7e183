//! Transcript View
//!
//! A render-ready projection of the conversation store. Surfaces (the CLI,
//! a web widget, tests) consume [`TranscriptView`] instead of walking the
//! raw message list themselves.

use serde::Serialize;

use crate::messages::{Author, Message, MessageId};

/// Presentation settings for a transcript
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayOptions {
    /// Label shown on assistant rows
    pub bot_name: String,
    /// Label shown on user rows
    pub user_label: String,
    /// Shown while the transcript is empty
    pub greeting: String,
    /// Input placeholder
    pub placeholder: String,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            bot_name: "AI-Chatbot".to_string(),
            user_label: "Me".to_string(),
            greeting: "Hello! I am your AI assistant. How can I assist you today?".to_string(),
            placeholder: "Write your question here..".to_string(),
        }
    }
}

/// One rendered message
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TranscriptRow {
    /// Id of the underlying message
    pub id: MessageId,
    /// Who wrote it
    pub author: Author,
    /// Author label
    pub label: String,
    /// Message body
    pub text: String,
    /// Creation time as `H:MM`
    pub time: String,
}

/// Everything a surface needs to draw the conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TranscriptView {
    /// Visible messages in order
    pub rows: Vec<TranscriptRow>,
    /// Set while waiting for the first chunk of a reply
    pub typing_indicator: Option<String>,
    /// Set when there is nothing to show yet
    pub greeting: Option<String>,
    /// Whether the input box accepts text
    pub input_locked: bool,
    /// Input placeholder
    pub placeholder: String,
}

impl TranscriptView {
    /// Project a message list
    ///
    /// Hidden messages never produce rows. The typing indicator shows only
    /// while `loading` and the newest record is from the user; once the
    /// reply exists it is drawn as a row instead. The greeting shows only
    /// for an empty store, so a transcript holding nothing but a hidden
    /// seed shows neither rows nor greeting.
    #[must_use]
    pub fn project(messages: &[Message], loading: bool, options: &DisplayOptions) -> Self {
        let rows = messages
            .iter()
            .filter(|message| message.visible)
            .map(|message| TranscriptRow {
                id: message.id.clone(),
                author: message.author,
                label: match message.author {
                    Author::User => options.user_label.clone(),
                    Author::Assistant => options.bot_name.clone(),
                },
                text: message.text.clone(),
                time: message.created_at.to_string(),
            })
            .collect();

        let awaiting_reply = matches!(messages.last(), Some(m) if m.author.is_user());
        let typing_indicator =
            (loading && awaiting_reply).then(|| format!("{} is typing...", options.bot_name));

        let greeting = messages.is_empty().then(|| options.greeting.clone());

        Self {
            rows,
            typing_indicator,
            greeting,
            input_locked: loading,
            placeholder: options.placeholder.clone(),
        }
    }

    /// Whether nothing at all is drawn in the message area
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.rows.is_empty() && self.typing_indicator.is_none() && self.greeting.is_none()
    }
}
