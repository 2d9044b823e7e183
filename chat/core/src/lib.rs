//! Chat Core - Headless Streaming Conversation Engine
//!
//! This crate holds the conversation logic of a chat widget, independent of
//! any UI framework. It keeps an ordered transcript, folds a streamed reply
//! into it chunk by chunk, serializes turns and gates clearing behind an
//! explicit confirmation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Host Surfaces                            │
//! │   ┌───────────┐    ┌────────────────┐    ┌─────────────────┐     │
//! │   │ chat-cli  │    │  web widget    │    │  test harness   │     │
//! │   └─────┬─────┘    └───────┬────────┘    └────────┬────────┘     │
//! │         └──────────────────┼──────────────────────┘              │
//! │          submit / seed     │     TranscriptView, TurnNotice      │
//! └────────────────────────────┼─────────────────────────────────────┘
//!                              │
//! ┌────────────────────────────┼─────────────────────────────────────┐
//! │                        CHAT CORE                                 │
//! │  ┌─────────────────────────┴──────────────────────────────────┐  │
//! │  │                    TurnController                          │  │
//! │  │   ┌──────────────┐   ┌───────────────┐   ┌─────────────┐   │  │
//! │  │   │  Generator   │──►│ StreamReducer │──►│ Conversation│   │  │
//! │  │   │ (Ollama/...) │   │    (fold)     │   │    Store    │◄┐ │  │
//! │  │   └──────────────┘   └───────────────┘   └─────────────┘ │ │  │
//! │  └──────────────────────────────────────────────────────────┼─┘  │
//! │                                            ResetGate ───────┘    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use chat_core::{
//!     backend::OllamaGenerator, ConversationStore, DisplayOptions, GenerationOptions,
//!     TurnController,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = ConversationStore::new();
//!     let generator = Arc::new(OllamaGenerator::from_env());
//!     let mut controller = TurnController::new(generator, store, GenerationOptions::default());
//!
//!     controller.submit("Hello!").await?;
//!     while controller.next_event().await.is_some() {
//!         let view = controller.view(&DisplayOptions::default());
//!         // Render view.rows
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`messages`]: Message records, ids and timestamps
//! - [`store`]: The shared, observable transcript
//! - [`stream`]: Stream events, payload normalization and the reply fold
//! - [`backend`]: Generation service abstraction (Ollama, scripted)
//! - [`turn`]: Turn state machine and host notifications
//! - [`reset`]: Confirmation-gated clearing
//! - [`display`]: Render-ready transcript projection
//! - [`config`]: Layered configuration (CLI, env, TOML, defaults)
//! - [`error`]: Error types
//!
//! # No UI Dependencies
//!
//! Nothing here draws anything. Surfaces read [`TranscriptView`] and
//! subscribe to store revisions.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod display;
pub mod error;
pub mod messages;
pub mod reset;
pub mod store;
pub mod stream;
pub mod turn;

pub use backend::{GenerationOptions, Generator};
pub use config::{load_config, ChatConfig, ConfigError, ConfigOverrides, ConfigSource};
pub use display::{DisplayOptions, TranscriptRow, TranscriptView};
pub use error::{GenerationError, TurnError};
pub use messages::{Author, ClockTime, Message, MessageId};
pub use reset::{PendingReset, ResetGate, ResetOutcome, ResetPrompt};
pub use store::{ConversationStore, Revision};
pub use stream::{FoldOutcome, Payload, StreamEvent, StreamReducer};
pub use turn::{TurnController, TurnNotice, TurnState};
