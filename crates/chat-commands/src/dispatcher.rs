//! Turning inbound messages into command runs.

use crate::argument::CollectionOutcome;
use crate::awaiting::AwaitingRegistry;
use crate::command::{any_usage, ArgsType, CommandArgs, PermissionCheck};
use crate::error::CommandError;
use crate::events::{BlockReason, DispatchEvent};
use crate::inhibitor::{Inhibition, Inhibitor};
use crate::invocation::CommandInvocation;
use crate::message::{ChatMessage, MessageId, SentMessage};
use crate::registry::{CommandRegistry, RegisteredCommand};
use crate::sanitize::{escape_markdown, Redactor};
use crate::settings::{resolve_prefix, SettingsProvider, SettingsScope};
use crate::throttle::{ThrottleDecision, Throttler};
use crate::tokenize::{parse_args, strip_wrapping_quotes};
use crate::transport::ChatTransport;
use futures::future::join_all;
use regex::{Regex, RegexBuilder};
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

const EVENT_CAPACITY: usize = 64;

/// Dispatcher behaviour switches.
#[derive(Debug, Clone)]
pub struct DispatcherOptions {
    /// Prefix used where no prefix is stored.
    pub default_prefix: Option<String>,
    /// User ids of the bot owners.
    pub owners: Vec<String>,
    /// Invite shown in error reports.
    pub invite: Option<String>,
    /// How long responses stay editable; zero disables edit handling.
    pub editable_duration: Duration,
    /// Prompt limit for commands that do not set their own.
    pub prompt_limit: Option<usize>,
    /// Whether an edited non-command message may become a command.
    pub non_command_editable: bool,
    /// Reply to unresolvable command names.
    pub unknown_command_response: bool,
    /// Send permission messages for pattern invocations.
    pub blocked_message_pattern: bool,
    /// Send throttling messages for pattern invocations.
    pub throttling_message_pattern: bool,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            default_prefix: Some("!".to_string()),
            owners: Vec::new(),
            invite: None,
            editable_duration: Duration::from_secs(30),
            prompt_limit: None,
            non_command_editable: true,
            unknown_command_response: true,
            blocked_message_pattern: true,
            throttling_message_pattern: true,
        }
    }
}

/// What happened to a message.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Not a command, or filtered out.
    Ignored,
    Blocked(BlockReason),
    Disabled,
    UnknownCommand,
    /// Argument collection was cancelled; holds the prompts and cancel notice.
    Cancelled(Vec<SentMessage>),
    /// The argument text could not be used; holds the usage reply.
    InvalidUsage(Vec<SentMessage>),
    /// The command ran; holds every response.
    Executed(Vec<SentMessage>),
}

struct CachedResult {
    responses: HashMap<String, Vec<SentMessage>>,
    expires_at: Instant,
}

enum ArgsResolution {
    Ready(CommandArgs),
    Stop(DispatchOutcome),
}

/// Decides whether messages are commands and runs them.
pub struct CommandDispatcher {
    transport: Arc<dyn ChatTransport>,
    registry: Arc<CommandRegistry>,
    settings: Arc<dyn SettingsProvider>,
    inhibitors: RwLock<Vec<Arc<dyn Inhibitor>>>,
    awaiting: Arc<AwaitingRegistry>,
    throttler: Throttler,
    throttle_window: Duration,
    results: Mutex<HashMap<MessageId, CachedResult>>,
    patterns: Mutex<HashMap<Option<String>, Regex>>,
    owners: Arc<Vec<String>>,
    options: DispatcherOptions,
    redactor: Redactor,
    events: broadcast::Sender<DispatchEvent>,
}

impl CommandDispatcher {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        registry: Arc<CommandRegistry>,
        settings: Arc<dyn SettingsProvider>,
        options: DispatcherOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let throttle_window = registry
            .commands()
            .iter()
            .filter_map(|c| c.command.info().throttling)
            .map(|t| Duration::from_secs(t.duration))
            .max()
            .unwrap_or_default();

        Self {
            transport,
            registry,
            settings,
            inhibitors: RwLock::new(Vec::new()),
            awaiting: Arc::new(AwaitingRegistry::new()),
            throttler: Throttler::new(),
            throttle_window,
            results: Mutex::new(HashMap::new()),
            patterns: Mutex::new(HashMap::new()),
            owners: Arc::new(options.owners.clone()),
            options,
            redactor: Redactor::new(),
            events,
        }
    }

    /// Redact `secret` from error reports.
    pub fn with_secret(mut self, secret: SecretString) -> Self {
        self.redactor.add(secret);
        self
    }

    /// Add an inhibitor; returns `false` if it was already registered.
    pub fn add_inhibitor(&self, inhibitor: Arc<dyn Inhibitor>) -> bool {
        let mut inhibitors = self.inhibitors.write().unwrap_or_else(PoisonError::into_inner);
        if inhibitors.iter().any(|i| Arc::ptr_eq(i, &inhibitor)) {
            return false;
        }
        inhibitors.push(inhibitor);
        true
    }

    /// Remove an inhibitor; returns `false` if it was not registered.
    pub fn remove_inhibitor(&self, inhibitor: &Arc<dyn Inhibitor>) -> bool {
        let mut inhibitors = self.inhibitors.write().unwrap_or_else(PoisonError::into_inner);
        let before = inhibitors.len();
        inhibitors.retain(|i| !Arc::ptr_eq(i, inhibitor));
        inhibitors.len() != before
    }

    /// Subscribe to dispatch events.
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.events.subscribe()
    }

    pub fn awaiting(&self) -> &Arc<AwaitingRegistry> {
        &self.awaiting
    }

    pub fn throttler(&self) -> &Throttler {
        &self.throttler
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Handle a new message, or an edit of `old` when given.
    pub async fn handle_message(
        &self,
        message: &ChatMessage,
        old: Option<&ChatMessage>,
    ) -> DispatchOutcome {
        if !self.should_handle(message, old) {
            return DispatchOutcome::Ignored;
        }
        self.handle_filtered(message, old).await
    }

    /// Handle a message that already passed [`Self::should_handle`].
    ///
    /// Transports that fan messages out to argument prompts must decide the
    /// filter before publishing, while the author's awaiting lease is held.
    #[instrument(skip(self, message, old), fields(message_id = %message.id, edit = old.is_some()))]
    pub async fn handle_filtered(
        &self,
        message: &ChatMessage,
        old: Option<&ChatMessage>,
    ) -> DispatchOutcome {
        self.prune_expired();

        let previous = match old {
            Some(old) => {
                let cached = self.cached_responses(&old.id);
                if cached.is_none() && !self.options.non_command_editable {
                    return DispatchOutcome::Ignored;
                }
                cached
            }
            None => None,
        };

        let prefix = self.prefix_for(message).await;
        let Some(mut invocation) = self.parse_message(message, prefix) else {
            if let Some(previous) = previous {
                self.discard_responses(&message.id, previous).await;
            }
            return DispatchOutcome::Ignored;
        };
        if let Some(previous) = previous {
            invocation = invocation.with_previous_responses(previous);
        }

        let (outcome, responses) = self.dispatch(&invocation).await;
        let grouped = invocation.finalize(&responses).await;
        self.cache_result(&message.id, old.is_some(), &outcome, grouped);
        outcome
    }

    /// Whether a message may be a command at all.
    pub fn should_handle(&self, message: &ChatMessage, old: Option<&ChatMessage>) -> bool {
        if message.author.bot || message.author.id == self.transport.user_id() {
            return false;
        }
        if message.channel.guild.as_ref().is_some_and(|g| !g.available) {
            return false;
        }
        if self
            .awaiting
            .is_awaiting(&message.author.id, &message.channel.id)
        {
            return false;
        }
        if old.is_some_and(|old| old.content == message.content) {
            return false;
        }
        true
    }

    async fn prefix_for(&self, message: &ChatMessage) -> Option<String> {
        let scope = SettingsScope::for_message(message);
        let default = self.options.default_prefix.as_deref();
        match resolve_prefix(self.settings.as_ref(), &scope, default).await {
            Ok(prefix) => prefix,
            Err(e) => {
                warn!(error = %e, "Failed to load command prefix, using default");
                default.map(str::to_string)
            }
        }
    }

    /// Find the command a message invokes.
    ///
    /// Command patterns are tried first, then `<mention> [prefix]name` or
    /// `prefix name`, and in direct messages a bare command name.
    fn parse_message(&self, message: &ChatMessage, prefix: Option<String>) -> Option<CommandInvocation> {
        for command in self.registry.commands() {
            for pattern in &command.patterns {
                if let Some(captures) = pattern.captures(&message.content) {
                    let matches = captures
                        .iter()
                        .map(|m| m.map(|m| m.as_str().to_string()))
                        .collect();
                    return Some(
                        self.base_invocation(message, prefix)
                            .with_pattern(Arc::clone(command), matches),
                    );
                }
            }
        }

        if let Some(pattern) = self.command_pattern(prefix.as_deref()) {
            if let Some(invocation) = self.match_default(message, &pattern, 2, prefix.clone()) {
                return Some(invocation);
            }
        }

        if message.channel.is_direct() {
            return self.match_default(message, bare_name_pattern(), 1, prefix);
        }
        None
    }

    fn match_default(
        &self,
        message: &ChatMessage,
        pattern: &Regex,
        name_index: usize,
        prefix: Option<String>,
    ) -> Option<CommandInvocation> {
        let captures = pattern.captures(&message.content)?;
        let name = captures.get(name_index)?.as_str();
        let end = captures.get(0)?.end();

        let mut commands = self.registry.find_commands(name, true);
        let invocation = self.base_invocation(message, prefix);
        if commands.len() != 1 || !commands[0].command.info().default_handling {
            debug!(name, "No single command matches");
            return Some(invocation);
        }

        let command = commands.remove(0);
        let arg_string = message.content[end..].to_string();
        Some(invocation.with_command(command, arg_string))
    }

    fn command_pattern(&self, prefix: Option<&str>) -> Option<Regex> {
        let key = prefix.map(str::to_string);
        let mut patterns = self.patterns.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pattern) = patterns.get(&key) {
            return Some(pattern.clone());
        }

        let mention = format!(r"<@!?{}>", regex::escape(self.transport.user_id()));
        let source = match prefix {
            Some(prefix) => {
                let escaped = regex::escape(prefix);
                format!(r"^({mention}\s+(?:{escaped}\s*)?|{escaped}\s*)([^\s]+)")
            }
            None => format!(r"^({mention}\s+)([^\s]+)"),
        };

        match RegexBuilder::new(&source).case_insensitive(true).build() {
            Ok(pattern) => {
                debug!(prefix = ?prefix, pattern = %source, "Built command pattern");
                patterns.insert(key, pattern.clone());
                Some(pattern)
            }
            Err(e) => {
                error!(error = %e, "Failed to build command pattern");
                None
            }
        }
    }

    fn base_invocation(&self, message: &ChatMessage, prefix: Option<String>) -> CommandInvocation {
        CommandInvocation::new(
            message.clone(),
            Arc::clone(&self.transport),
            Arc::clone(&self.awaiting),
        )
        .with_prefix(prefix)
        .with_owners(Arc::clone(&self.owners))
        .with_registry(Arc::clone(&self.registry))
    }

    async fn dispatch(&self, invocation: &CommandInvocation) -> (DispatchOutcome, Vec<SentMessage>) {
        let command_name = invocation.command().map(|c| c.name().to_string());

        if let Some(inhibition) = self.inhibit(invocation).await {
            let reason = BlockReason::Inhibitor(inhibition.reason);
            return self
                .block(invocation, command_name, reason, inhibition.response)
                .await;
        }

        let Some(command) = invocation.command().cloned() else {
            self.emit(DispatchEvent::UnknownCommand {
                message_id: invocation.message().id.clone(),
            });
            let mut responses = Vec::new();
            if self.options.unknown_command_response {
                let text = format!("Unknown command. Use {}.", any_usage("help", None, None));
                self.reply_into(invocation, &text, &mut responses).await;
            }
            return (DispatchOutcome::UnknownCommand, responses);
        };

        if !self
            .registry
            .is_enabled_in(command.name(), invocation.message().guild_id())
        {
            let mut responses = Vec::new();
            let text = format!("The command `{}` is disabled.", command.name());
            self.reply_into(invocation, &text, &mut responses).await;
            return (DispatchOutcome::Disabled, responses);
        }

        self.run_command(invocation, &command).await
    }

    /// Run every inhibitor; the first blocking one in registration order wins.
    async fn inhibit(&self, invocation: &CommandInvocation) -> Option<Inhibition> {
        let inhibitors = self
            .inhibitors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        join_all(inhibitors.iter().map(|i| i.inhibit(invocation)))
            .await
            .into_iter()
            .flatten()
            .next()
    }

    async fn run_command(
        &self,
        invocation: &CommandInvocation,
        command: &Arc<RegisteredCommand>,
    ) -> (DispatchOutcome, Vec<SentMessage>) {
        let info = command.command.info();
        let name = info.name.clone();
        let message = invocation.message();
        let from_pattern = invocation.pattern_matches().is_some();

        if info.guild_only && message.channel.is_direct() {
            let text = format!("The `{name}` command must be used in a group chat.");
            return self
                .block(invocation, Some(name), BlockReason::GuildOnly, Some(text))
                .await;
        }

        if info.nsfw && !message.channel.nsfw {
            let text = format!("The `{name}` command must be used in NSFW channels.");
            return self
                .block(invocation, Some(name), BlockReason::Nsfw, Some(text))
                .await;
        }

        let silence_blocks = from_pattern && !self.options.blocked_message_pattern;
        let denial = match command.command.has_permission(invocation).await {
            PermissionCheck::Granted => None,
            PermissionCheck::Denied => Some(format!(
                "You do not have permission to use the `{name}` command."
            )),
            PermissionCheck::DeniedWith(text) => Some(text),
        };
        if let Some(text) = denial {
            let text = (!silence_blocks).then_some(text);
            return self
                .block(invocation, Some(name), BlockReason::Permission, text)
                .await;
        }

        if !info.client_permissions.is_empty() && !message.channel.is_direct() {
            let missing = match self
                .transport
                .missing_permissions(&message.channel, &info.client_permissions)
                .await
            {
                Ok(missing) => missing,
                Err(e) => {
                    warn!(command = %name, error = %e, "Failed to check bot permissions");
                    Vec::new()
                }
            };
            if !missing.is_empty() {
                let text = (!silence_blocks).then(|| missing_permissions_text(&name, &missing));
                return self
                    .block(invocation, Some(name), BlockReason::ClientPermissions(missing), text)
                    .await;
            }
        }

        if let Some(throttling) = &info.throttling {
            if !invocation.is_owner() {
                if self.throttle_window > Duration::ZERO {
                    self.throttler.prune(self.throttle_window);
                }
                if let ThrottleDecision::Throttled { remaining } =
                    self.throttler.hit(&name, &message.author.id, throttling)
                {
                    let text = (!from_pattern || self.options.throttling_message_pattern).then(|| {
                        format!(
                            "You may not use the `{name}` command again for another {remaining} seconds."
                        )
                    });
                    return self
                        .block(invocation, Some(name), BlockReason::Throttling { remaining }, text)
                        .await;
                }
            }
        }

        let mut responses = Vec::new();
        let result = match self.resolve_args(invocation, command, &mut responses).await {
            Ok(ArgsResolution::Stop(outcome)) => return (outcome, responses),
            Ok(ArgsResolution::Ready(args)) => {
                info!(command = %name, from_pattern, "Running command");
                self.emit(DispatchEvent::CommandRun {
                    command: name.clone(),
                    message_id: message.id.clone(),
                    from_pattern,
                });
                command.command.run(invocation, args, from_pattern).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(sent) => responses.extend(sent),
            Err(CommandError::Friendly(text)) => {
                self.reply_into(invocation, &text, &mut responses).await;
            }
            Err(e) => {
                error!(command = %name, error = %e, "Command failed");
                self.emit(DispatchEvent::CommandError {
                    command: name.clone(),
                    message_id: message.id.clone(),
                    error: self.redactor.redact(&e.to_string()),
                });
                let report = self.error_report(&e);
                self.reply_into(invocation, &report, &mut responses).await;
            }
        }

        (DispatchOutcome::Executed(responses.clone()), responses)
    }

    async fn resolve_args(
        &self,
        invocation: &CommandInvocation,
        command: &RegisteredCommand,
        responses: &mut Vec<SentMessage>,
    ) -> Result<ArgsResolution, CommandError> {
        if let Some(matches) = invocation.pattern_matches() {
            return Ok(ArgsResolution::Ready(CommandArgs::Pattern(matches.to_vec())));
        }

        let info = command.command.info();
        let arg_string = invocation.arg_string().unwrap_or_default();

        let Some(collector) = &command.collector else {
            let args = match info.args_type {
                ArgsType::Single => CommandArgs::Single(
                    strip_wrapping_quotes(arg_string, info.args_single_quotes).to_string(),
                ),
                ArgsType::Multiple => {
                    CommandArgs::Multiple(parse_args(arg_string, None, info.args_single_quotes))
                }
            };
            return Ok(ArgsResolution::Ready(args));
        };

        let count = (!collector.has_infinite()).then_some(collector.args().len());
        let provided = parse_args(arg_string, count, info.args_single_quotes);
        let limit = collector.prompt_limit().or(self.options.prompt_limit);
        let result = collector
            .obtain_with_limit(invocation, provided, limit)
            .await?;
        responses.extend(result.prompts.iter().cloned());

        let reason = match result.outcome {
            CollectionOutcome::Complete(values) => {
                return Ok(ArgsResolution::Ready(CommandArgs::Collected(values)))
            }
            CollectionOutcome::Cancelled(reason) => reason,
        };

        debug!(command = %info.name, %reason, "Argument collection cancelled");
        self.emit(DispatchEvent::CommandCancelled {
            command: info.name.clone(),
            message_id: invocation.message().id.clone(),
            reason,
        });

        if result.prompts.is_empty() {
            let prefix = invocation.prefix();
            let text = format!(
                "Invalid command usage. The `{}` command's accepted format is: {}. Use {} for more information.",
                info.name,
                info.usage(None, prefix, None),
                any_usage(&format!("help {}", info.name), prefix, None)
            );
            responses.push(invocation.reply(&text).await?);
            return Ok(ArgsResolution::Stop(DispatchOutcome::InvalidUsage(
                responses.clone(),
            )));
        }

        responses.push(invocation.reply("Cancelled command.").await?);
        Ok(ArgsResolution::Stop(DispatchOutcome::Cancelled(
            responses.clone(),
        )))
    }

    async fn block(
        &self,
        invocation: &CommandInvocation,
        command: Option<String>,
        reason: BlockReason,
        response: Option<String>,
    ) -> (DispatchOutcome, Vec<SentMessage>) {
        debug!(command = ?command, %reason, "Command blocked");
        self.emit(DispatchEvent::CommandBlocked {
            command,
            message_id: invocation.message().id.clone(),
            reason: reason.clone(),
        });

        let mut responses = Vec::new();
        if let Some(text) = response {
            self.reply_into(invocation, &text, &mut responses).await;
        }
        (DispatchOutcome::Blocked(reason), responses)
    }

    async fn reply_into(
        &self,
        invocation: &CommandInvocation,
        text: &str,
        responses: &mut Vec<SentMessage>,
    ) {
        match invocation.reply(text).await {
            Ok(sent) => responses.push(sent),
            Err(e) => warn!(error = %e, "Failed to send response"),
        }
    }

    fn error_report(&self, error: &CommandError) -> String {
        let detail = self.redactor.redact(&error.to_string()).replace('`', "");
        let contact = match &self.options.invite {
            Some(invite) => format!(" in this server: {invite}"),
            None => ".".to_string(),
        };
        format!(
            "An error occurred while running the command: `{}: {}`\n\
             You shouldn't ever receive an error like this.\n\
             Please contact {}{}",
            error.kind(),
            detail,
            owner_list(&self.options.owners),
            contact
        )
    }

    fn emit(&self, event: DispatchEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn results(&self) -> MutexGuard<'_, HashMap<MessageId, CachedResult>> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cached_responses(&self, id: &MessageId) -> Option<HashMap<String, Vec<SentMessage>>> {
        self.results().get(id).map(|cached| cached.responses.clone())
    }

    fn cache_result(
        &self,
        id: &MessageId,
        is_edit: bool,
        outcome: &DispatchOutcome,
        responses: HashMap<String, Vec<SentMessage>>,
    ) {
        if self.options.editable_duration.is_zero() {
            return;
        }

        let mut results = self.results();
        if matches!(outcome, DispatchOutcome::Blocked(_)) && responses.is_empty() {
            results.remove(id);
            return;
        }

        let fresh = Instant::now() + self.options.editable_duration;
        let expires_at = match results.get(id) {
            Some(cached) if is_edit => cached.expires_at,
            _ => fresh,
        };
        results.insert(
            id.clone(),
            CachedResult {
                responses,
                expires_at,
            },
        );
    }

    /// An edit turned a command into plain text: delete its responses.
    async fn discard_responses(&self, id: &MessageId, previous: HashMap<String, Vec<SentMessage>>) {
        for sent in previous.into_values().flatten() {
            if let Err(e) = self.transport.delete(&sent).await {
                warn!(message_id = %sent.id, error = %e, "Failed to delete stale response");
            }
        }

        let mut results = self.results();
        if self.options.non_command_editable {
            if let Some(cached) = results.get_mut(id) {
                cached.responses.clear();
            }
        } else {
            results.remove(id);
        }
    }

    fn prune_expired(&self) {
        let now = Instant::now();
        self.results().retain(|_, cached| cached.expires_at > now);
    }
}

fn bare_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([^\s]+)").unwrap())
}

fn missing_permissions_text(command: &str, missing: &[String]) -> String {
    if let [only] = missing {
        return format!("I need the `{only}` permission for the `{command}` command to work.");
    }
    let list = missing
        .iter()
        .map(|p| format!("`{p}`"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("I need the following permissions for the `{command}` command to work:\n{list}")
}

fn owner_list(owners: &[String]) -> String {
    let owners: Vec<String> = owners.iter().map(|o| escape_markdown(o)).collect();
    match owners.as_slice() {
        [] => "the bot owner".to_string(),
        [only] => only.clone(),
        [first, second] => format!("{first} or {second}"),
        [rest @ .., last] => format!("{}, or {}", rest.join(", "), last),
    }
}
