//! Turn Controller
//!
//! Orchestrates one turn at a time: appends the user message, opens the
//! generation request and routes every event of the resulting stream
//! through the [`StreamReducer`].
//!
//! # State Machine
//!
//! ```text
//! Idle ──submit──► AwaitingFirstChunk ──first data/error──► Streaming
//!  ▲                     │                                     │
//!  │                     └──────────── open failure ───────────┤
//!  └─────────────────────────── end / channel closed ──────────┘
//! ```
//!
//! `loading` and the input lock are derived from the state and cannot drift
//! apart. An `error` event moves the turn to `Streaming` like any chunk;
//! only `end` (or the channel closing) returns it to `Idle`.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::backend::{EventStream, GenerationOptions, Generator};
use crate::config::ChatConfig;
use crate::display::{DisplayOptions, TranscriptView};
use crate::error::TurnError;
use crate::messages::{Message, MessageId};
use crate::store::ConversationStore;
use crate::stream::{FoldOutcome, StreamReducer};

/// Where the current turn stands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// No turn in flight; input accepted
    #[default]
    Idle,
    /// Request opened, nothing received yet
    AwaitingFirstChunk,
    /// At least one chunk folded, waiting for `end`
    Streaming,
}

impl TurnState {
    /// Whether a new turn may start
    #[must_use]
    pub fn is_idle(self) -> bool {
        self == Self::Idle
    }

    /// Short human-readable description
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingFirstChunk => "awaiting first chunk",
            Self::Streaming => "streaming",
        }
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Notifications sent to the host while turns progress
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnNotice {
    /// The controller moved to a new state
    StateChanged {
        /// New state
        state: TurnState,
    },
    /// The generation request could not be opened
    SubmissionFailed {
        /// Rendered error
        error: String,
    },
    /// The turn finished
    TurnEnded {
        /// Last assistant message written by the turn, if any
        reply: Option<MessageId>,
    },
    /// The stream closed without an `end` event
    StreamClosed,
}

/// Drives turns against a generator
pub struct TurnController<G: Generator + ?Sized> {
    /// Generation service
    generator: Arc<G>,
    /// Shared transcript
    store: ConversationStore,
    /// Fold for the active stream
    reducer: StreamReducer,
    /// Options forwarded with every request
    options: GenerationOptions,
    /// Current state
    state: TurnState,
    /// Event stream of the active turn
    events: Option<EventStream>,
    /// Assistant message the active turn last wrote to
    reply: Option<MessageId>,
    /// When the active turn started
    started: Option<Instant>,
    /// Host notification channel
    notices: Option<mpsc::Sender<TurnNotice>>,
}

impl<G: Generator + ?Sized> TurnController<G> {
    /// Create a controller over a store handle
    pub fn new(generator: Arc<G>, store: ConversationStore, options: GenerationOptions) -> Self {
        Self {
            generator,
            reducer: StreamReducer::new(store.clone()),
            store,
            options,
            state: TurnState::Idle,
            events: None,
            reply: None,
            started: None,
            notices: None,
        }
    }

    /// Create a controller with options taken from configuration
    pub fn from_config(generator: Arc<G>, store: ConversationStore, config: &ChatConfig) -> Self {
        Self::new(generator, store, config.generation_options())
    }

    /// Send [`TurnNotice`]s to the given channel
    #[must_use]
    pub fn with_notices(mut self, notices: mpsc::Sender<TurnNotice>) -> Self {
        self.notices = Some(notices);
        self
    }

    /// Current state
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Whether a reply is being waited for
    pub fn is_loading(&self) -> bool {
        !self.state.is_idle()
    }

    /// Whether the host should refuse new input
    pub fn is_input_locked(&self) -> bool {
        self.is_loading()
    }

    /// The transcript handle
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Options sent with every request
    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// Name of the generation service
    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Whether an event stream is open
    pub fn has_stream(&self) -> bool {
        self.events.is_some()
    }

    /// Start a turn with user input
    ///
    /// Blank input is ignored and returns `Ok(None)`. Otherwise the user
    /// message is appended before the request is opened and its id is
    /// returned.
    ///
    /// # Errors
    ///
    /// [`TurnError::TurnInProgress`] when the previous turn has not ended
    /// (nothing is mutated), [`TurnError::SubmissionOpen`] when the request
    /// could not be opened (the controller is idle again).
    pub async fn submit(&mut self, text: &str) -> Result<Option<MessageId>, TurnError> {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!("Ignoring blank submission");
            return Ok(None);
        }
        self.begin(Message::user(text)).await.map(Some)
    }

    /// Start a turn whose user message stays out of the rendered transcript
    ///
    /// Used for a scripted opening message.
    ///
    /// # Errors
    ///
    /// Same as [`TurnController::submit`].
    pub async fn seed(&mut self, text: &str) -> Result<Option<MessageId>, TurnError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        self.begin(Message::hidden_user(text)).await.map(Some)
    }

    async fn begin(&mut self, message: Message) -> Result<MessageId, TurnError> {
        if !self.state.is_idle() {
            tracing::error!(state = %self.state, "Turn started before the previous one ended");
            return Err(TurnError::TurnInProgress { state: self.state });
        }

        let visible = message.visible;
        let text = message.text.clone();
        let id = self.store.append(message);

        self.reducer = StreamReducer::new(self.store.clone());
        self.reply = None;
        self.started = Some(Instant::now());
        self.set_state(TurnState::AwaitingFirstChunk).await;

        tracing::info!(
            generator = self.generator.name(),
            visible,
            len = text.len(),
            "Turn started"
        );

        match self.generator.send_message(&text, &self.options).await {
            Ok(events) => {
                self.events = Some(events);
                Ok(id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to open generation request");
                self.started = None;
                self.set_state(TurnState::Idle).await;
                self.notify(TurnNotice::SubmissionFailed {
                    error: e.to_string(),
                })
                .await;
                Err(TurnError::SubmissionOpen(e))
            }
        }
    }

    /// Wait for and fold the next event of the active stream
    ///
    /// Returns `None` when no stream is open. A channel that closes
    /// without `end` is folded as an implicit end.
    pub async fn next_event(&mut self) -> Option<FoldOutcome> {
        let event = self.events.as_mut()?.recv().await;

        let Some(event) = event else {
            tracing::warn!(state = %self.state, "Stream closed without an end event");
            self.notify(TurnNotice::StreamClosed).await;
            self.finish().await;
            return Some(FoldOutcome::Ended);
        };

        let outcome = self.reducer.apply(event);
        match outcome {
            FoldOutcome::Opened(ref id) | FoldOutcome::Extended(ref id) => {
                self.reply = Some(id.clone());
                if self.state == TurnState::AwaitingFirstChunk {
                    self.set_state(TurnState::Streaming).await;
                }
            }
            FoldOutcome::Ended => self.finish().await,
        }
        Some(outcome)
    }

    /// Fold events until the active turn ends
    ///
    /// Returns the number of events folded, including the final one.
    pub async fn drive(&mut self) -> usize {
        let mut count = 0;
        while self.has_stream() {
            if self.next_event().await.is_none() {
                break;
            }
            count += 1;
        }
        count
    }

    /// Render-ready projection of the transcript
    pub fn view(&self, options: &DisplayOptions) -> TranscriptView {
        self.store
            .read(|messages| TranscriptView::project(messages, self.is_loading(), options))
    }

    async fn finish(&mut self) {
        self.events = None;
        let elapsed_ms = self
            .started
            .take()
            .map_or(0, |s| u64::try_from(s.elapsed().as_millis()).unwrap_or(u64::MAX));

        tracing::info!(
            elapsed_ms,
            chunks = self.reducer.folded(),
            bytes = self.reducer.folded_bytes(),
            "Turn ended"
        );

        self.set_state(TurnState::Idle).await;
        let reply = self.reply.take();
        self.notify(TurnNotice::TurnEnded { reply }).await;
    }

    async fn set_state(&mut self, state: TurnState) {
        self.state = state;
        self.notify(TurnNotice::StateChanged { state }).await;
    }

    async fn notify(&self, notice: TurnNotice) {
        if let Some(ref tx) = self.notices {
            if let Err(e) = tx.send(notice).await {
                tracing::warn!("Failed to send turn notice to host: {}", e);
            }
        }
    }
}

impl<G: Generator + ?Sized> fmt::Debug for TurnController<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnController")
            .field("generator", &self.generator.name())
            .field("state", &self.state)
            .field("options", &self.options)
            .field("has_stream", &self.events.is_some())
            .field("messages", &self.store.len())
            .finish_non_exhaustive()
    }
}
