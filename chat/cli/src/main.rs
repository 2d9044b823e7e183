//! Chat CLI - Interactive Terminal Front-End
//!
//! Wires the headless chat engine to stdin/stdout and an Ollama-compatible
//! generation service.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a local Ollama
//! chat-cli
//!
//! # Different model and a hidden opening message
//! chat-cli --model mistral --initial-message "Introduce yourself"
//!
//! # No server needed: every message is echoed back
//! chat-cli --offline
//!
//! # Verbose logging (to stderr)
//! RUST_LOG=debug chat-cli
//! ```
//!
//! # Commands
//!
//! - `/clear`: clear the conversation (asks for confirmation)
//! - `/quit`: exit (Ctrl-C works too)

mod repl;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use chat_core::backend::{OllamaGenerator, ScriptedGenerator};
use chat_core::config::{default_config_path, load_config_from_path};
use chat_core::{ChatConfig, ConfigOverrides, Generator};

use repl::Repl;

/// Chat CLI - talk to a streaming assistant from the terminal
#[derive(Parser, Debug)]
#[command(name = "chat-cli")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "CHAT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Generation service host
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Generation service port
    #[arg(short = 'p', long, value_name = "PORT")]
    port: Option<u16>,

    /// Model to ask for
    #[arg(short = 'm', long, value_name = "MODEL")]
    model: Option<String>,

    /// Display name for assistant messages
    #[arg(long, value_name = "NAME")]
    bot_name: Option<String>,

    /// Opaque session identifier forwarded with every request
    #[arg(long, value_name = "ID")]
    memory_id: Option<String>,

    /// Hidden opening message that triggers a first reply
    #[arg(long, value_name = "TEXT")]
    initial_message: Option<String>,

    /// Echo messages back instead of calling a server
    #[arg(long)]
    offline: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "CHAT_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(ref name) = self.bot_name {
            overrides = overrides.with_bot_name(name.clone());
        }
        if let Some(ref memory_id) = self.memory_id {
            overrides = overrides.with_memory_id(memory_id.clone());
        }
        if let Some(ref message) = self.initial_message {
            overrides = overrides.with_initial_message(message.clone());
        }
        if let Some(ref host) = self.host {
            overrides = overrides.with_host(host.clone());
        }
        if let Some(port) = self.port {
            overrides = overrides.with_port(port);
        }
        if let Some(ref model) = self.model {
            overrides = overrides.with_model(model.clone());
        }
        overrides
    }
}

/// Initialize logging with the specified level
///
/// Logs go to stderr so they never interleave with the transcript.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("chat_cli={level},chat_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

/// Merge file, environment and command line into one configuration
fn resolve_config(args: &Args) -> Result<ChatConfig> {
    let path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(path).context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn build_generator(args: &Args, config: &ChatConfig) -> Arc<dyn Generator> {
    if args.offline {
        info!("Offline mode, replies are echoed");
        return Arc::new(ScriptedGenerator::echo());
    }

    let generator =
        OllamaGenerator::from_config(&config.generator).with_event_buffer(config.event_buffer);
    if !generator.health_check().await {
        warn!(
            host = %config.generator.host,
            port = config.generator.port,
            "Generation service not reachable, messages will fail until it is up"
        );
    }
    Arc::new(generator)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = resolve_config(&args)?;
    info!(
        source = %config.source(),
        file = ?config.config_file_path,
        model = %config.generator.model,
        "Configuration loaded"
    );

    let generator = build_generator(&args, &config).await;
    let mut repl = Repl::new(generator, &config);
    let result = repl.run(config.initial_message.as_deref()).await;

    match result {
        Ok(()) => {
            info!("Chat session ended");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Chat session failed");
            Err(e)
        }
    }
}
