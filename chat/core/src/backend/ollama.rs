//! Ollama Generator
//!
//! [`Generator`] implementation for an Ollama-compatible server.
//!
//! # Ollama API
//!
//! - `/api/generate` - streaming completions as newline-delimited JSON
//! - `/api/tags` - list available models (used as a health check)
//!
//! Each NDJSON line maps to stream events: `response` text becomes `data`,
//! an `error` field becomes `error`, `done: true` becomes `end`. Transport
//! failures mid-stream are reported as `error` followed by `end` so a turn
//! driven by this adapter always terminates.

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

use super::traits::{EventStream, GenerationOptions, Generator};
use crate::config::GeneratorConfig;
use crate::error::GenerationError;
use crate::stream::{Payload, StreamEvent};

/// Ollama HTTP client
#[derive(Clone)]
pub struct OllamaGenerator {
    /// Host address
    host: String,
    /// Port number
    port: u16,
    /// Model name
    model: String,
    /// HTTP client
    http_client: reqwest::Client,
    /// Capacity of the event channel handed to the caller
    event_buffer: usize,
}

impl OllamaGenerator {
    /// Create a new generator
    pub fn new(host: impl Into<String>, port: u16, model: impl Into<String>) -> Self {
        Self::with_timeout(host, port, model, Duration::from_secs(120))
    }

    /// Create a new generator with a request timeout
    pub fn with_timeout(
        host: impl Into<String>,
        port: u16,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self {
            host: host.into(),
            port,
            model: model.into(),
            http_client,
            event_buffer: 100,
        }
    }

    /// Set the capacity of the event channel
    #[must_use]
    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }

    /// Create from configuration
    #[must_use]
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::with_timeout(
            config.host.clone(),
            config.port,
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Create from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = GeneratorConfig::default();
        crate::config::apply_generator_env(&mut config, |key| std::env::var(key).ok());
        Self::from_config(&config)
    }

    /// Model this generator asks for
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the base URL
    fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Get generate endpoint URL
    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url())
    }

    /// Get tags endpoint URL
    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url())
    }

    /// Check if the server is reachable
    pub async fn health_check(&self) -> bool {
        self.http_client
            .get(self.tags_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .is_ok()
    }
}

impl Default for OllamaGenerator {
    fn default() -> Self {
        Self::from_config(&GeneratorConfig::default())
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn send_message(
        &self,
        text: &str,
        options: &GenerationOptions,
    ) -> Result<EventStream, GenerationError> {
        if let Some(ref memory_id) = options.memory_id {
            // Ollama keeps no server-side memory; the id is only traced
            tracing::debug!(memory_id = %memory_id, "Memory id not used by Ollama");
        }

        let body = serde_json::json!({
            "model": self.model,
            "prompt": text,
            "stream": true,
        });

        let response = self
            .http_client
            .post(self.generate_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    GenerationError::Unavailable(e.to_string())
                } else {
                    GenerationError::Transport(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Http { status, body });
        }

        let (tx, rx) = mpsc::channel(self.event_buffer);
        tokio::spawn(forward_events(response.bytes_stream(), tx));

        Ok(rx)
    }
}

/// Pump an NDJSON byte stream into stream events
///
/// Bytes are buffered until a full line is available, so a character split
/// across network chunks is decoded whole. Always finishes with `end`
/// unless the receiver went away.
async fn forward_events<S, B, E>(mut stream: S, tx: mpsc::Sender<StreamEvent>)
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                buffer.extend_from_slice(bytes.as_ref());

                while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    if !forward_line(&tx, &line).await {
                        return;
                    }
                }
            }
            Err(e) => {
                let _ = tx.send(StreamEvent::error(e.to_string())).await;
                let _ = tx.send(StreamEvent::End).await;
                return;
            }
        }
    }

    // Flush a final line without trailing newline
    if !forward_line(&tx, &buffer).await {
        return;
    }

    // Body ended without a done marker
    let _ = tx.send(StreamEvent::End).await;
}

/// Send the events of one complete line; `false` once streaming should stop
async fn forward_line(tx: &mpsc::Sender<StreamEvent>, line: &[u8]) -> bool {
    let line = match std::str::from_utf8(line) {
        Ok(line) => Cow::Borrowed(line),
        Err(e) => {
            tracing::warn!(error = %e, "Stream line is not valid UTF-8");
            String::from_utf8_lossy(line)
        }
    };

    for event in parse_line(&line) {
        let done = event == StreamEvent::End;
        if tx.send(event).await.is_err() {
            // Receiver dropped, stop streaming
            return false;
        }
        if done {
            return false;
        }
    }
    true
}

/// Translate one NDJSON line into stream events
fn parse_line(line: &str) -> Vec<StreamEvent> {
    let line = line.trim();
    if line.is_empty() {
        return Vec::new();
    }

    let Ok(data) = serde_json::from_str::<serde_json::Value>(line) else {
        tracing::debug!(line = %line, "Skipping unparseable stream line");
        return Vec::new();
    };

    let mut events = Vec::new();

    if let Some(error) = data.get("error") {
        let payload = serde_json::from_value::<Payload>(error.clone())
            .unwrap_or_else(|_| Payload::Other(error.clone()));
        events.push(StreamEvent::Error(payload));
    }

    if let Some(token) = data.get("response").and_then(|r| r.as_str()) {
        if !token.is_empty() {
            events.push(StreamEvent::data(token));
        }
    }

    if data
        .get("done")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
    {
        events.push(StreamEvent::End);
    }

    events
}
