//! Signal command bot.
//!
//! Wires the Signal REST client into the command framework: received
//! messages go through [`SignalTransport`] to a [`CommandDispatcher`].

pub mod commands;
pub mod config;
pub mod error;
pub mod transport;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::transport::SignalTransport;
use chat_commands::{
    Command, CommandDispatcher, CommandRegistry, DispatchEvent, DispatchOutcome, SettingsProvider,
    TypeRegistry,
};
use settings_store::MemorySettings;
use signal_client::{Account, BotMessage, SignalClient};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A running bot: transport, settings and dispatcher.
#[derive(Clone)]
pub struct Bot {
    transport: Arc<SignalTransport>,
    dispatcher: Arc<CommandDispatcher>,
}

impl Bot {
    /// Build the bot with the built-in commands plus `extra`.
    pub fn new(config: &Config, client: SignalClient, extra: Vec<Arc<dyn Command>>) -> AppResult<Self> {
        let transport = Arc::new(SignalTransport::new(client));
        let settings: Arc<dyn SettingsProvider> = Arc::new(MemorySettings::new());

        let mut registry = CommandRegistry::new(TypeRegistry::with_defaults());
        let builtins = commands::builtin_commands(settings.clone(), config.default_prefix());
        for command in builtins.into_iter().chain(extra) {
            registry.register(command)?;
        }
        info!("Registered {} commands", registry.commands().len());

        let mut dispatcher = CommandDispatcher::new(
            transport.clone(),
            Arc::new(registry),
            settings,
            config.dispatcher_options(),
        );
        if let Some(token) = &config.signal.api_token {
            dispatcher = dispatcher.with_secret(token.clone());
        }

        Ok(Self {
            transport,
            dispatcher: Arc::new(dispatcher),
        })
    }

    pub fn transport(&self) -> &Arc<SignalTransport> {
        &self.transport
    }

    pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
        &self.dispatcher
    }

    /// Record a received message and dispatch it on its own task.
    ///
    /// Returns `None` when the message is filtered out, including replies to
    /// a pending argument prompt. The filter runs before the message is
    /// published to prompts; dispatch runs detached so replies can arrive
    /// while a command waits for them.
    pub fn handle(&self, raw: BotMessage) -> Option<JoinHandle<DispatchOutcome>> {
        let inbound = self.transport.record(raw);
        let accepted = self
            .dispatcher
            .should_handle(&inbound.message, inbound.previous.as_ref());
        self.transport.publish(&inbound.message);
        if !accepted {
            debug!(message_id = %inbound.message.id, "Message filtered");
            return None;
        }

        let dispatcher = self.dispatcher.clone();
        Some(tokio::spawn(async move {
            dispatcher
                .handle_filtered(&inbound.message, inbound.previous.as_ref())
                .await
        }))
    }

    /// Log dispatch events until the dispatcher goes away.
    pub fn spawn_event_logger(&self) -> JoinHandle<()> {
        let mut events = self.dispatcher.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => log_event(&event),
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event logger lagged"),
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

/// Fetch the bot's account and fail unless it is registered.
pub async fn verify_account(client: &SignalClient) -> AppResult<Account> {
    let account = client.get_account().await?;
    if !account.registered {
        return Err(AppError::Unregistered(account.number));
    }
    info!(number = %account.number, uuid = ?account.uuid, "Signal account registered");
    Ok(account)
}

fn log_event(event: &DispatchEvent) {
    match event {
        DispatchEvent::CommandBlocked {
            command, reason, ..
        } => info!(command = ?command, %reason, "Command blocked"),
        DispatchEvent::UnknownCommand { message_id } => {
            debug!(%message_id, "Unknown command")
        }
        DispatchEvent::CommandRun {
            command,
            from_pattern,
            ..
        } => info!(%command, from_pattern, "Command run"),
        DispatchEvent::CommandError { command, error, .. } => {
            warn!(%command, %error, "Command error")
        }
        DispatchEvent::CommandCancelled {
            command, reason, ..
        } => info!(%command, %reason, "Command cancelled"),
    }
}
