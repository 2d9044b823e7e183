//! Generator Traits
//!
//! Trait definitions for the text-generation collaborator. The engine only
//! needs one capability: send a message, get back an event stream.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::GenerationError;
use crate::stream::StreamEvent;

/// Receiving half of one request's event stream
///
/// Events arrive in generation order. A closed channel means no further
/// events will be delivered.
pub type EventStream = mpsc::Receiver<StreamEvent>;

/// Per-request session options
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationOptions {
    /// Opaque session/memory identifier, forwarded untouched
    pub memory_id: Option<String>,
}

impl GenerationOptions {
    /// Set the memory identifier
    ///
    /// Empty identifiers are dropped so the service never sees `""`.
    #[must_use]
    pub fn with_memory_id(mut self, memory_id: Option<impl Into<String>>) -> Self {
        self.memory_id = memory_id.map(Into::into).filter(|id| !id.is_empty());
        self
    }
}

/// Text generation service
///
/// Implement this trait to plug a different provider into the engine.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &str;

    /// Open a generation request
    ///
    /// Returns as soon as the request is accepted; the reply arrives on the
    /// returned stream. Errors here mean no stream was opened at all.
    async fn send_message(
        &self,
        text: &str,
        options: &GenerationOptions,
    ) -> Result<EventStream, GenerationError>;
}

#[async_trait]
impl<G: Generator + ?Sized> Generator for Arc<G> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn send_message(
        &self,
        text: &str,
        options: &GenerationOptions,
    ) -> Result<EventStream, GenerationError> {
        (**self).send_message(text, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_id_forwarded_when_present() {
        let options = GenerationOptions::default().with_memory_id(Some("mem-42"));
        assert_eq!(options.memory_id.as_deref(), Some("mem-42"));
    }

    #[test]
    fn test_empty_memory_id_dropped() {
        let options = GenerationOptions::default().with_memory_id(Some(""));
        assert_eq!(options.memory_id, None);

        let options = GenerationOptions::default().with_memory_id(None::<String>);
        assert_eq!(options.memory_id, None);
    }
}
