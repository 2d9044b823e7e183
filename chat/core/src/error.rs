//! Engine Errors
//!
//! Typed failures surfaced to the host. Stream-level `error` events are
//! deliberately absent here: they are reply text, not Rust errors.

use thiserror::Error;

use crate::turn::TurnState;

/// Failures opening a request against the generation service
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The service could not be reached
    #[error("Generation service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with a non-success status
    #[error("Generation service returned {status}: {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body (may be empty)
        body: String,
    },

    /// Transport-level failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The request was refused before any stream was opened
    #[error("Request rejected: {0}")]
    Rejected(String),
}

/// Failures of the turn controller
#[derive(Debug, Error)]
pub enum TurnError {
    /// The generation request could not be started
    ///
    /// By the time the host sees this the controller is idle again and the
    /// transcript holds only the user message.
    #[error("Failed to open generation request: {0}")]
    SubmissionOpen(#[source] GenerationError),

    /// A new turn was started before the previous one ended
    ///
    /// Turns must be serialized; nothing was mutated.
    #[error("A turn is already in progress ({state})")]
    TurnInProgress {
        /// State the controller was in
        state: TurnState,
    },
}

impl TurnError {
    /// Whether this error reports misuse of the engine rather than a
    /// runtime failure
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::TurnInProgress { .. })
    }
}
