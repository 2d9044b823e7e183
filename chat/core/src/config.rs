//! TOML Configuration File Support
//!
//! Configuration surface for the chat engine and its front-ends, with an
//! optional TOML file at `~/.config/chat-widget/chat.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [chat]
//! bot_name = "Helper"
//! memory_id = "support-desk"
//! initial_message = "Introduce yourself in one sentence."
//! placeholder = "Ask me anything.."
//!
//! [chat.reset_prompt]
//! title = "Start over?"
//!
//! [generator]
//! host = "localhost"
//! port = 11434
//! model = "llama3.2"
//! timeout_secs = 120
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::GenerationOptions;
use crate::display::DisplayOptions;
use crate::reset::ResetPrompt;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[chat]` section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatToml {
    /// Display name for assistant messages
    pub bot_name: Option<String>,

    /// Opaque session/memory identifier
    pub memory_id: Option<String>,

    /// Hidden opening message
    pub initial_message: Option<String>,

    /// Input placeholder text
    pub placeholder: Option<String>,

    /// Greeting shown on an empty transcript
    pub greeting: Option<String>,

    /// Notification channel capacity
    pub event_buffer: Option<usize>,

    /// Clear-confirmation dialog text
    pub reset_prompt: Option<ResetPrompt>,
}

/// `[generator]` section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorToml {
    /// Server host
    pub host: Option<String>,

    /// Server port
    pub port: Option<u16>,

    /// Model name
    pub model: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigToml {
    /// Chat section
    pub chat: ChatToml,

    /// Generator section
    pub generator: GeneratorToml,
}

// =============================================================================
// Main Configuration Structs
// =============================================================================

/// Generation service endpoint
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Model name
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 11434,
            model: "llama3.2".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Centralized configuration for a chat widget
#[derive(Clone, Debug)]
pub struct ChatConfig {
    /// Display name for assistant messages
    pub bot_name: String,

    /// Opaque session/memory identifier, forwarded with every request
    pub memory_id: Option<String>,

    /// Hidden opening message that triggers a first reply
    pub initial_message: Option<String>,

    /// Input placeholder text
    pub placeholder: String,

    /// Greeting shown while the transcript is empty
    pub greeting: String,

    /// Clear-confirmation dialog text
    pub reset_prompt: ResetPrompt,

    /// Capacity of the stream event and host notification channels
    pub event_buffer: usize,

    /// Generation service endpoint
    pub generator: GeneratorConfig,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            bot_name: "AI-Chatbot".to_string(),
            memory_id: None,
            initial_message: None,
            placeholder: "Write your question here..".to_string(),
            greeting: "Hello! I am your AI assistant. How can I assist you today?".to_string(),
            reset_prompt: ResetPrompt::default(),
            event_buffer: 100,
            generator: GeneratorConfig::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ChatConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Options sent with every generation request
    #[must_use]
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions::default().with_memory_id(self.memory_id.clone())
    }

    /// Options for the transcript projection
    #[must_use]
    pub fn display_options(&self) -> DisplayOptions {
        DisplayOptions {
            bot_name: self.bot_name.clone(),
            greeting: self.greeting.clone(),
            placeholder: self.placeholder.clone(),
            ..DisplayOptions::default()
        }
    }

    /// Check values that would make the widget unusable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "bot_name must not be empty".to_string(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "event_buffer must be at least 1".to_string(),
            ));
        }
        if self.generator.port == 0 {
            return Err(ConfigError::ValidationError(
                "generator.port must not be 0".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/chat-widget/chat.toml` or
/// `~/.config/chat-widget/chat.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("chat-widget").join("chat.toml"))
}

/// Load configuration from the default path, then the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<ChatConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path, then the environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// or if the merged result fails validation.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ChatConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration from a specific path with an explicit environment
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env(
    path: Option<PathBuf>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ChatConfig, ConfigError> {
    let mut config = ChatConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ConfigToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, lookup);

    config.validate()?;
    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ChatConfig, toml: &ConfigToml) {
    let chat = &toml.chat;
    if let Some(ref name) = chat.bot_name {
        config.bot_name = name.clone();
    }
    if let Some(ref memory_id) = chat.memory_id {
        config.memory_id = non_empty(memory_id);
    }
    if let Some(ref message) = chat.initial_message {
        config.initial_message = non_empty(message);
    }
    if let Some(ref placeholder) = chat.placeholder {
        config.placeholder = placeholder.clone();
    }
    if let Some(ref greeting) = chat.greeting {
        config.greeting = greeting.clone();
    }
    if let Some(buffer) = chat.event_buffer {
        config.event_buffer = buffer;
    }
    if let Some(ref prompt) = chat.reset_prompt {
        config.reset_prompt = prompt.clone();
    }

    let generator = &toml.generator;
    if let Some(ref host) = generator.host {
        config.generator.host = host.clone();
    }
    if let Some(port) = generator.port {
        config.generator.port = port;
    }
    if let Some(ref model) = generator.model {
        config.generator.model = model.clone();
    }
    if let Some(timeout) = generator.timeout_secs {
        config.generator.timeout_secs = timeout;
    }
}

/// Apply environment overrides through a variable lookup
///
/// Takes the lookup as a closure so tests never touch the process
/// environment.
pub fn apply_env_config(config: &mut ChatConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(name) = lookup("CHAT_BOT_NAME") {
        config.bot_name = name;
        config.source = ConfigSource::Env;
    }
    if let Some(memory_id) = lookup("CHAT_MEMORY_ID") {
        config.memory_id = non_empty(&memory_id);
        config.source = ConfigSource::Env;
    }
    if let Some(message) = lookup("CHAT_INITIAL_MESSAGE") {
        config.initial_message = non_empty(&message);
        config.source = ConfigSource::Env;
    }
    if apply_generator_env(&mut config.generator, lookup) {
        config.source = ConfigSource::Env;
    }
}

/// Apply generator endpoint overrides; returns whether anything changed
///
/// `OLLAMA_HOST`/`OLLAMA_PORT` are honored as fallbacks.
pub fn apply_generator_env(
    config: &mut GeneratorConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> bool {
    let mut changed = false;

    if let Some(host) = lookup("CHAT_GENERATOR_HOST").or_else(|| lookup("OLLAMA_HOST")) {
        config.host = host;
        changed = true;
    }
    if let Some(port) = lookup("CHAT_GENERATOR_PORT").or_else(|| lookup("OLLAMA_PORT")) {
        match port.parse::<u16>() {
            Ok(port) => {
                config.port = port;
                changed = true;
            }
            Err(_) => tracing::warn!(value = %port, "Ignoring invalid generator port"),
        }
    }
    if let Some(model) = lookup("CHAT_MODEL") {
        config.model = model;
        changed = true;
    }

    changed
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Bot name override
    pub bot_name: Option<String>,

    /// Memory id override
    pub memory_id: Option<String>,

    /// Initial message override
    pub initial_message: Option<String>,

    /// Generator host override
    pub host: Option<String>,

    /// Generator port override
    pub port: Option<u16>,

    /// Model override
    pub model: Option<String>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bot name override
    #[must_use]
    pub fn with_bot_name(mut self, name: String) -> Self {
        self.bot_name = Some(name);
        self
    }

    /// Set memory id override
    #[must_use]
    pub fn with_memory_id(mut self, memory_id: String) -> Self {
        self.memory_id = Some(memory_id);
        self
    }

    /// Set initial message override
    #[must_use]
    pub fn with_initial_message(mut self, message: String) -> Self {
        self.initial_message = Some(message);
        self
    }

    /// Set generator host override
    #[must_use]
    pub fn with_host(mut self, host: String) -> Self {
        self.host = Some(host);
        self
    }

    /// Set generator port override
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set model override
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut ChatConfig) {
        if self.bot_name.is_some()
            || self.memory_id.is_some()
            || self.initial_message.is_some()
            || self.host.is_some()
            || self.port.is_some()
            || self.model.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref name) = self.bot_name {
            config.bot_name = name.clone();
        }
        if let Some(ref memory_id) = self.memory_id {
            config.memory_id = non_empty(memory_id);
        }
        if let Some(ref message) = self.initial_message {
            config.initial_message = non_empty(message);
        }
        if let Some(ref host) = self.host {
            config.generator.host = host.clone();
        }
        if let Some(port) = self.port {
            config.generator.port = port;
        }
        if let Some(ref model) = self.model {
            config.generator.model = model.clone();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
