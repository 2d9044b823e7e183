//! Interactive loop
//!
//! One task multiplexes stdin lines, the active reply stream and Ctrl-C
//! with `tokio::select!`. Replies are printed incrementally as chunks are
//! folded into the store.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdout};
use tokio::sync::mpsc;

use chat_core::reset::PendingReset;
use chat_core::{
    ChatConfig, ConversationStore, DisplayOptions, FoldOutcome, Generator, MessageId,
    ResetGate, ResetOutcome, TurnController, TurnNotice,
};

/// Notices produced between two drains stay well below this
const MIN_NOTICE_BUFFER: usize = 16;

/// What the user typed
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Clear,
    Quit,
    Say(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        match line.trim() {
            "/clear" => Self::Clear,
            "/quit" | "/exit" => Self::Quit,
            text => Self::Say(text),
        }
    }
}

/// Writes replies as they grow
struct TranscriptPrinter<W> {
    out: W,
    options: DisplayOptions,
    /// Reply being printed and how many bytes of it are on screen
    current: Option<(MessageId, usize)>,
}

impl<W: AsyncWrite + Unpin> TranscriptPrinter<W> {
    fn new(out: W, options: DisplayOptions) -> Self {
        Self {
            out,
            options,
            current: None,
        }
    }

    async fn line(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await?;
        Ok(())
    }

    async fn prompt(&mut self) -> Result<()> {
        let prompt = format!("{}> ", self.options.user_label);
        self.out.write_all(prompt.as_bytes()).await?;
        self.out.flush().await?;
        Ok(())
    }

    async fn fold(&mut self, store: &ConversationStore, outcome: &FoldOutcome) -> Result<()> {
        match outcome {
            FoldOutcome::Opened(id) => {
                if self.current.is_some() {
                    self.out.write_all(b"\n").await?;
                }
                if let Some(message) = store.get(id) {
                    let header = format!("{} ({}): ", self.options.bot_name, message.created_at);
                    self.out.write_all(header.as_bytes()).await?;
                }
                self.current = Some((id.clone(), 0));
                self.write_delta(store, id).await?;
            }
            FoldOutcome::Extended(id) => self.write_delta(store, id).await?,
            FoldOutcome::Ended => {
                if self.current.take().is_some() {
                    self.out.write_all(b"\n").await?;
                }
            }
        }
        self.out.flush().await?;
        Ok(())
    }

    async fn write_delta(&mut self, store: &ConversationStore, id: &MessageId) -> Result<()> {
        let Some((ref current, ref mut printed)) = self.current else {
            return Ok(());
        };
        if current != id {
            return Ok(());
        }
        let Some(message) = store.get(id) else {
            return Ok(());
        };
        if let Some(delta) = message.text.get(*printed..) {
            self.out.write_all(delta.as_bytes()).await?;
            *printed = message.text.len();
        }
        Ok(())
    }
}

/// The interactive session
pub struct Repl<W = Stdout> {
    controller: TurnController<dyn Generator>,
    store: ConversationStore,
    gate: ResetGate,
    printer: TranscriptPrinter<W>,
    notices: mpsc::Receiver<TurnNotice>,
    pending_reset: Option<PendingReset>,
}

impl Repl {
    /// Build a session around a generator, printing to stdout
    pub fn new(generator: Arc<dyn Generator>, config: &ChatConfig) -> Self {
        Self::with_output(generator, config, tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Unpin> Repl<W> {
    /// Build a session printing to `out`
    pub fn with_output(generator: Arc<dyn Generator>, config: &ChatConfig, out: W) -> Self {
        let store = ConversationStore::new();
        let (tx, notices) = mpsc::channel(config.event_buffer.max(MIN_NOTICE_BUFFER));
        let controller =
            TurnController::from_config(generator, store.clone(), config).with_notices(tx);

        Self {
            controller,
            gate: ResetGate::with_prompt(store.clone(), config.reset_prompt.clone()),
            printer: TranscriptPrinter::new(out, config.display_options()),
            store,
            notices,
            pending_reset: None,
        }
    }

    /// Run until `/quit`, end of input or Ctrl-C
    ///
    /// # Errors
    ///
    /// Fails only when stdin or the output break.
    pub async fn run(&mut self, initial_message: Option<&str>) -> Result<()> {
        let view = self.controller.view(&self.printer.options);
        if let Some(greeting) = view.greeting {
            if initial_message.is_none() {
                let line = format!("{}: {greeting}", self.printer.options.bot_name);
                self.printer.line(&line).await?;
            }
        }

        if let Some(seed) = initial_message {
            if let Err(e) = self.controller.seed(seed).await {
                tracing::warn!(error = %e, "Initial message could not be sent");
            }
        }
        self.report_notices().await?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        if !self.controller.is_loading() {
            self.printer.prompt().await?;
        }

        loop {
            tokio::select! {
                outcome = self.controller.next_event(), if self.controller.has_stream() => {
                    if let Some(outcome) = outcome {
                        self.print_outcome(&outcome).await?;
                    }
                }
                line = lines.next_line() => {
                    let Some(line) = line.context("Failed to read stdin")? else {
                        tracing::debug!("End of input");
                        break;
                    };
                    if !self.handle_line(&line).await? {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupted");
                    break;
                }
            }
            self.report_notices().await?;
        }

        if let Some(pending) = self.pending_reset.take() {
            pending.cancel();
        }
        Ok(())
    }

    async fn print_outcome(&mut self, outcome: &FoldOutcome) -> Result<()> {
        self.printer.fold(&self.store, outcome).await?;
        // The reset question keeps the input until answered
        if *outcome == FoldOutcome::Ended && self.pending_reset.is_none() {
            self.printer.prompt().await?;
        }
        Ok(())
    }

    /// Returns `false` when the session should end
    async fn handle_line(&mut self, line: &str) -> Result<bool> {
        if let Some(pending) = self.pending_reset.take() {
            let confirmed = line.trim().eq_ignore_ascii_case("y");
            match pending.resolve(confirmed) {
                ResetOutcome::Cleared { removed } => {
                    self.printer.current = None;
                    self.printer
                        .line(&format!("Conversation cleared ({removed} messages)."))
                        .await?;
                }
                ResetOutcome::Cancelled => self.printer.line("Kept the conversation.").await?,
            }
            if !self.controller.is_loading() {
                self.printer.prompt().await?;
            }
            return Ok(true);
        }

        match Command::parse(line) {
            Command::Quit => return Ok(false),
            Command::Clear => {
                let pending = self.gate.request();
                let prompt = pending.prompt();
                let question = format!(
                    "{} {} [y/N] ({} / {})",
                    prompt.title, prompt.body, prompt.confirm_label, prompt.cancel_label
                );
                self.printer.line(&question).await?;
                self.pending_reset = Some(pending);
            }
            Command::Say("") => self.printer.prompt().await?,
            Command::Say(_) if self.controller.is_input_locked() => {
                self.printer
                    .line("Please wait until the reply has finished.")
                    .await?;
            }
            Command::Say(text) => match self.controller.submit(text).await {
                Ok(_) => {
                    let view = self.controller.view(&self.printer.options);
                    if let Some(indicator) = view.typing_indicator {
                        tracing::debug!(%indicator, "Awaiting reply");
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Submission failed");
                    self.printer.prompt().await?;
                }
            },
        }
        Ok(true)
    }

    async fn report_notices(&mut self) -> Result<()> {
        while let Ok(notice) = self.notices.try_recv() {
            match notice {
                TurnNotice::SubmissionFailed { error } => {
                    self.printer.line(&format!("! {error}")).await?;
                }
                TurnNotice::StreamClosed => {
                    tracing::debug!("Reply stream closed early");
                }
                TurnNotice::StateChanged { state } => {
                    tracing::debug!(%state, "Turn state changed");
                }
                TurnNotice::TurnEnded { reply } => {
                    tracing::debug!(reply = ?reply, "Turn ended");
                }
            }
        }
        Ok(())
    }
}
