//! A message being handled as a command.

use crate::awaiting::AwaitingRegistry;
use crate::message::{ChatMessage, SentMessage, DM_KEY};
use crate::registry::{CommandRegistry, RegisteredCommand};
use crate::transport::{ChatTransport, TransportError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// How a response is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// A plain message in the channel.
    Plain,
    /// A reply to the invoking user; plain in direct messages.
    Reply,
    /// A direct message to the invoking user.
    Direct,
}

#[derive(Debug, Default)]
struct ResponseState {
    /// Responses from an earlier run of the same message, reused as edit targets.
    previous: HashMap<String, Vec<SentMessage>>,
    /// Responses sent so far per cache key.
    positions: HashMap<String, usize>,
}

/// The triggering message plus everything resolved about it.
pub struct CommandInvocation {
    message: ChatMessage,
    command: Option<Arc<RegisteredCommand>>,
    arg_string: Option<String>,
    pattern_matches: Option<Vec<Option<String>>>,
    prefix: Option<String>,
    owners: Arc<Vec<String>>,
    transport: Arc<dyn ChatTransport>,
    awaiting: Arc<AwaitingRegistry>,
    registry: Option<Arc<CommandRegistry>>,
    responses: Mutex<ResponseState>,
}

impl CommandInvocation {
    pub fn new(
        message: ChatMessage,
        transport: Arc<dyn ChatTransport>,
        awaiting: Arc<AwaitingRegistry>,
    ) -> Self {
        Self {
            message,
            command: None,
            arg_string: None,
            pattern_matches: None,
            prefix: None,
            owners: Arc::new(Vec::new()),
            transport,
            awaiting,
            registry: None,
            responses: Mutex::new(ResponseState::default()),
        }
    }

    /// Resolved command with the text following its name.
    pub fn with_command(mut self, command: Arc<RegisteredCommand>, arg_string: impl Into<String>) -> Self {
        self.command = Some(command);
        self.arg_string = Some(arg_string.into());
        self
    }

    /// Resolved command triggered by one of its patterns.
    pub fn with_pattern(mut self, command: Arc<RegisteredCommand>, matches: Vec<Option<String>>) -> Self {
        self.command = Some(command);
        self.pattern_matches = Some(matches);
        self
    }

    pub fn with_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn with_owners(mut self, owners: Arc<Vec<String>>) -> Self {
        self.owners = owners;
        self
    }

    pub fn with_registry(mut self, registry: Arc<CommandRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Responses of an earlier run, edited in place instead of sending new ones.
    pub fn with_previous_responses(self, previous: HashMap<String, Vec<SentMessage>>) -> Self {
        self.state().previous = previous;
        self
    }

    pub fn message(&self) -> &ChatMessage {
        &self.message
    }

    pub fn command(&self) -> Option<&Arc<RegisteredCommand>> {
        self.command.as_ref()
    }

    /// Text after the command name; `None` for pattern and unmatched invocations.
    pub fn arg_string(&self) -> Option<&str> {
        self.arg_string.as_deref()
    }

    pub fn pattern_matches(&self) -> Option<&[Option<String>]> {
        self.pattern_matches.as_deref()
    }

    /// Command prefix in effect where the message was sent.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn transport(&self) -> &Arc<dyn ChatTransport> {
        &self.transport
    }

    pub fn awaiting(&self) -> &Arc<AwaitingRegistry> {
        &self.awaiting
    }

    pub fn registry(&self) -> Option<&Arc<CommandRegistry>> {
        self.registry.as_ref()
    }

    pub fn owners(&self) -> &[String] {
        &self.owners
    }

    pub fn is_owner(&self) -> bool {
        self.owners.iter().any(|owner| *owner == self.message.author.id)
    }

    /// Usage text for `command` with this invocation's prefix and the bot mention.
    pub fn usage(&self, command: &str) -> String {
        let mention = self.message.channel.guild.as_ref().map(|_| self.transport.user_id());
        crate::command::any_usage(command, self.prefix(), mention)
    }

    /// Send a plain message to the channel.
    pub async fn say(&self, content: &str) -> Result<SentMessage, TransportError> {
        self.respond(ResponseKind::Plain, content).await
    }

    /// Reply to the invoking user.
    pub async fn reply(&self, content: &str) -> Result<SentMessage, TransportError> {
        self.respond(ResponseKind::Reply, content).await
    }

    /// Send a direct message to the invoking user.
    pub async fn direct(&self, content: &str) -> Result<SentMessage, TransportError> {
        self.respond(ResponseKind::Direct, content).await
    }

    /// Send a response, editing the matching response of an earlier run
    /// when there is one.
    pub async fn respond(
        &self,
        kind: ResponseKind,
        content: &str,
    ) -> Result<SentMessage, TransportError> {
        let kind = match kind {
            ResponseKind::Reply if self.message.channel.is_direct() => ResponseKind::Plain,
            other => other,
        };
        let key = match kind {
            ResponseKind::Direct => DM_KEY.to_string(),
            _ => self.message.channel.cache_key().to_string(),
        };

        let target = {
            let mut state = self.state();
            let position = *state.positions.get(&key).unwrap_or(&0);
            state.positions.insert(key.clone(), position + 1);
            state
                .previous
                .get(&key)
                .and_then(|sent| sent.get(position))
                .cloned()
        };

        if let Some(previous) = target {
            return self.transport.edit(&previous, content).await;
        }

        match kind {
            ResponseKind::Plain => self.transport.send(&self.message.channel, content).await,
            ResponseKind::Reply => self.transport.reply(&self.message, content).await,
            ResponseKind::Direct => self.transport.direct(&self.message.author.id, content).await,
        }
    }

    /// Delete earlier responses not reused by this run, and group `responses`
    /// by cache key.
    pub async fn finalize(&self, responses: &[SentMessage]) -> HashMap<String, Vec<SentMessage>> {
        let previous = std::mem::take(&mut self.state().previous);
        for sent in previous.into_values().flatten() {
            if responses.iter().any(|r| r.id == sent.id) {
                continue;
            }
            if let Err(e) = self.transport.delete(&sent).await {
                warn!(message_id = %sent.id, error = %e, "Failed to delete stale response");
            }
        }

        let mut grouped: HashMap<String, Vec<SentMessage>> = HashMap::new();
        for sent in responses {
            grouped
                .entry(sent.channel.cache_key().to_string())
                .or_default()
                .push(sent.clone());
        }
        grouped
    }

    fn state(&self) -> MutexGuard<'_, ResponseState> {
        self.responses.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CommandInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandInvocation")
            .field("message", &self.message.id)
            .field("command", &self.command.as_ref().map(|c| c.name()))
            .field("arg_string", &self.arg_string)
            .field("pattern_matches", &self.pattern_matches)
            .finish()
    }
}
