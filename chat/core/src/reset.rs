//! Reset Gate
//!
//! Confirmation-gated clearing of the conversation store.
//!
//! ```text
//! ResetGate::request() ──► PendingReset ──confirm()──► store emptied
//!                                      └─cancel()───► nothing
//! ```
//!
//! The only path to a clear goes through [`PendingReset::confirm`], and a
//! `PendingReset` can only be obtained from [`ResetGate::request`]. Dropping
//! a pending reset is the same as cancelling it.

use serde::{Deserialize, Serialize};

use crate::store::ConversationStore;

/// Text of the clear-confirmation dialog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetPrompt {
    /// Dialog title
    pub title: String,
    /// Explanation shown under the title
    pub body: String,
    /// Label of the confirming action
    pub confirm_label: String,
    /// Label of the cancelling action
    pub cancel_label: String,
}

impl Default for ResetPrompt {
    fn default() -> Self {
        Self {
            title: "Do you really want to clear the chat?".to_string(),
            body: "By clicking yes the chatbot history will be deleted and your \
                   conversations will be lost"
                .to_string(),
            confirm_label: "Yes".to_string(),
            cancel_label: "Cancel".to_string(),
        }
    }
}

/// Result of resolving a pending reset
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetOutcome {
    /// The store was cleared
    Cleared {
        /// How many records were removed
        removed: usize,
    },
    /// The user backed out; nothing changed
    Cancelled,
}

/// Entry point for clearing a transcript
#[derive(Clone, Debug)]
pub struct ResetGate {
    store: ConversationStore,
    prompt: ResetPrompt,
}

impl ResetGate {
    /// Create a gate over a store handle with the default prompt
    #[must_use]
    pub fn new(store: ConversationStore) -> Self {
        Self::with_prompt(store, ResetPrompt::default())
    }

    /// Create a gate with custom dialog text
    #[must_use]
    pub fn with_prompt(store: ConversationStore, prompt: ResetPrompt) -> Self {
        Self { store, prompt }
    }

    /// The dialog text
    #[must_use]
    pub fn prompt(&self) -> &ResetPrompt {
        &self.prompt
    }

    /// Open the confirmation step
    pub fn request(&self) -> PendingReset {
        tracing::debug!("Reset requested, awaiting confirmation");
        PendingReset {
            store: self.store.clone(),
            prompt: self.prompt.clone(),
        }
    }
}

/// A reset awaiting the user's answer
#[must_use = "a pending reset does nothing until confirmed"]
#[derive(Debug)]
pub struct PendingReset {
    store: ConversationStore,
    prompt: ResetPrompt,
}

impl PendingReset {
    /// The dialog text to show while waiting
    #[must_use]
    pub fn prompt(&self) -> &ResetPrompt {
        &self.prompt
    }

    /// Clear the whole transcript
    ///
    /// Irreversible. Returns the number of records removed.
    pub fn confirm(self) -> usize {
        let removed = self.store.mutate(|messages| {
            let removed = messages.len();
            messages.clear();
            removed
        });
        tracing::info!(removed, "Conversation cleared");
        removed
    }

    /// Back out without touching the transcript
    pub fn cancel(self) {
        tracing::debug!("Reset cancelled");
    }

    /// Resolve with the user's answer
    pub fn resolve(self, confirmed: bool) -> ResetOutcome {
        if confirmed {
            ResetOutcome::Cleared {
                removed: self.confirm(),
            }
        } else {
            self.cancel();
            ResetOutcome::Cancelled
        }
    }
}
