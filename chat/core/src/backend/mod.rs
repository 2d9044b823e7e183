//! Generation Service Integration
//!
//! The engine talks to the remote text generator through the [`Generator`]
//! trait. A request either fails to open (a [`GenerationError`]) or yields
//! an ordered, finite stream of [`StreamEvent`]s.
//!
//! # Available Generators
//!
//! - **Ollama**: HTTP adapter for an Ollama-compatible server
//! - **Scripted**: in-memory generator for tests and offline demos
//!
//! # Usage
//!
//! ```ignore
//! use chat_core::backend::{Generator, GenerationOptions, OllamaGenerator};
//!
//! let generator = OllamaGenerator::from_env();
//! let mut events = generator.send_message("Hello!", &GenerationOptions::default()).await?;
//! while let Some(event) = events.recv().await {
//!     // fold
//! }
//! ```
//!
//! [`GenerationError`]: crate::error::GenerationError
//! [`StreamEvent`]: crate::stream::StreamEvent

mod ollama;
mod scripted;
mod traits;

pub use ollama::OllamaGenerator;
pub use scripted::{Script, ScriptedGenerator, SentRequest};
pub use traits::{EventStream, GenerationOptions, Generator};
