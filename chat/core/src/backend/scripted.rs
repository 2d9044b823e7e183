//! Scripted Generator
//!
//! An in-memory [`Generator`] that answers requests from a queue of
//! scripts. Used by the test suites and for offline runs of the CLI.
//!
//! # Usage
//!
//! ```ignore
//! use chat_core::backend::{Script, ScriptedGenerator};
//! use chat_core::stream::StreamEvent;
//!
//! let generator = ScriptedGenerator::new();
//! generator.push(Script::reply(["Hel", "lo"]));
//! generator.push(Script::Fail("auth expired".into()));
//!
//! // Hand-driven stream: the test pushes events itself
//! generator.push(Script::Open);
//! // ... after submit:
//! let tx = generator.take_sender().unwrap();
//! tx.send(StreamEvent::data("chunk")).await?;
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::traits::{EventStream, GenerationOptions, Generator};
use crate::error::GenerationError;
use crate::stream::{Payload, StreamEvent};

/// How the next request is answered
#[derive(Clone, Debug)]
pub enum Script {
    /// Deliver these events, then close the stream
    Events(Vec<StreamEvent>),
    /// Refuse to open the request
    Fail(String),
    /// Open a stream and hand its sender to the test via
    /// [`ScriptedGenerator::take_sender`]
    Open,
}

impl Script {
    /// Deliver `chunks` as data events followed by `end`
    pub fn reply<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut events: Vec<StreamEvent> = chunks
            .into_iter()
            .map(|chunk| StreamEvent::Data(Payload::Text(chunk.into())))
            .collect();
        events.push(StreamEvent::End);
        Self::Events(events)
    }
}

/// A request observed by the scripted generator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentRequest {
    /// Text that was sent
    pub text: String,
    /// Options that accompanied it
    pub options: GenerationOptions,
}

#[derive(Default)]
struct ScriptedState {
    scripts: VecDeque<Script>,
    requests: Vec<SentRequest>,
    senders: VecDeque<mpsc::Sender<StreamEvent>>,
    echo: bool,
}

/// Generator that replays queued scripts
#[derive(Clone, Default)]
pub struct ScriptedGenerator {
    state: Arc<Mutex<ScriptedState>>,
}

impl ScriptedGenerator {
    /// Create a generator with an empty script queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a generator that echoes every request back
    ///
    /// Handy for running the CLI without a model server.
    #[must_use]
    pub fn echo() -> Self {
        let generator = Self::new();
        generator.state.lock().echo = true;
        generator
    }

    /// Queue a script for the next request
    pub fn push(&self, script: Script) {
        self.state.lock().scripts.push_back(script);
    }

    /// Every request seen so far, in order
    #[must_use]
    pub fn requests(&self) -> Vec<SentRequest> {
        self.state.lock().requests.clone()
    }

    /// Number of requests seen so far
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Take the sender of the oldest stream opened by [`Script::Open`]
    #[must_use]
    pub fn take_sender(&self) -> Option<mpsc::Sender<StreamEvent>> {
        self.state.lock().senders.pop_front()
    }

    fn next_script(&self, text: &str, options: &GenerationOptions) -> Option<Script> {
        let mut state = self.state.lock();
        state.requests.push(SentRequest {
            text: text.to_string(),
            options: options.clone(),
        });
        match state.scripts.pop_front() {
            Some(script) => Some(script),
            None if state.echo => Some(Script::reply([format!("You said: {text}")])),
            None => None,
        }
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn send_message(
        &self,
        text: &str,
        options: &GenerationOptions,
    ) -> Result<EventStream, GenerationError> {
        match self.next_script(text, options) {
            Some(Script::Events(events)) => {
                let (tx, rx) = mpsc::channel(events.len().max(1));
                for event in events {
                    // Capacity covers every event, so this never fails
                    let _ = tx.try_send(event);
                }
                Ok(rx)
            }
            Some(Script::Fail(reason)) => Err(GenerationError::Rejected(reason)),
            Some(Script::Open) => {
                let (tx, rx) = mpsc::channel(100);
                self.state.lock().senders.push_back(tx);
                Ok(rx)
            }
            None => Err(GenerationError::Unavailable(
                "no scripted response queued".to_string(),
            )),
        }
    }
}
