//! Shared helpers for chat-commands integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chat_commands::{
    ArgValue, ArgumentInfo, Author, Channel, ChatMessage, ChatTransport, Command, CommandArgs,
    CommandDispatcher, CommandError, CommandInfo, CommandInvocation, CommandRegistry,
    DispatcherOptions, MessageId, ReplyFilter, SentMessage, SettingsError, SettingsProvider,
    SettingsScope, TransportError, TypeRegistry,
};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BOT_ID: &str = "bot";

/// Transport that records what the bot sends and plays back scripted replies.
///
/// A scripted `None` (or an empty script) lets the wait elapse, which with a
/// paused tokio clock happens instantly.
#[derive(Default)]
pub struct FakeTransport {
    replies: Mutex<VecDeque<Option<String>>>,
    sent: Mutex<Vec<SentMessage>>,
    edited: Mutex<Vec<SentMessage>>,
    deleted: Mutex<Vec<SentMessage>>,
    missing: Mutex<Vec<String>>,
    waits: Mutex<Vec<Duration>>,
    next_id: AtomicU64,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script<I, S>(&self, replies: I)
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        self.replies
            .lock()
            .unwrap()
            .extend(replies.into_iter().map(|r| r.map(Into::into)));
    }

    pub fn set_missing_permissions(&self, missing: &[&str]) {
        *self.missing.lock().unwrap() = missing.iter().map(|s| s.to_string()).collect();
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.content).collect()
    }

    pub fn edited(&self) -> Vec<SentMessage> {
        self.edited.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<SentMessage> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }

    fn next_id(&self) -> MessageId {
        MessageId::new(format!("out-{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    fn user_id(&self) -> &str {
        BOT_ID
    }

    async fn send(&self, channel: &Channel, content: &str) -> Result<SentMessage, TransportError> {
        let sent = SentMessage {
            id: self.next_id(),
            channel: channel.clone(),
            content: content.to_string(),
        };
        self.sent.lock().unwrap().push(sent.clone());
        Ok(sent)
    }

    async fn edit(&self, message: &SentMessage, content: &str) -> Result<SentMessage, TransportError> {
        let edited = SentMessage {
            content: content.to_string(),
            ..message.clone()
        };
        self.edited.lock().unwrap().push(edited.clone());
        Ok(edited)
    }

    async fn delete(&self, message: &SentMessage) -> Result<(), TransportError> {
        self.deleted.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn collect_one(
        &self,
        filter: &ReplyFilter,
        wait: Duration,
    ) -> Result<Option<ChatMessage>, TransportError> {
        self.waits.lock().unwrap().push(wait);
        let next = self.replies.lock().unwrap().pop_front().flatten();
        match next {
            Some(text) => {
                let channel = Channel {
                    id: filter.channel_id.clone(),
                    guild: None,
                    nsfw: false,
                };
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                Ok(Some(ChatMessage::new(
                    format!("in-{id}"),
                    Author::new(filter.author_id.clone()),
                    channel,
                    text,
                )))
            }
            None => {
                tokio::time::sleep(wait).await;
                Ok(None)
            }
        }
    }

    async fn missing_permissions(
        &self,
        _channel: &Channel,
        required: &[String],
    ) -> Result<Vec<String>, TransportError> {
        let missing = self.missing.lock().unwrap();
        Ok(required
            .iter()
            .filter(|p| missing.contains(p))
            .cloned()
            .collect())
    }
}

/// Settings kept in a map.
#[derive(Default)]
pub struct MapSettings {
    values: Mutex<HashMap<(SettingsScope, String), Value>>,
}

impl MapSettings {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl SettingsProvider for MapSettings {
    async fn get(&self, scope: &SettingsScope, key: &str) -> Result<Option<Value>, SettingsError> {
        Ok(self
            .values
            .lock()
            .unwrap()
            .get(&(scope.clone(), key.to_string()))
            .cloned())
    }

    async fn set(&self, scope: &SettingsScope, key: &str, value: Value) -> Result<(), SettingsError> {
        self.values
            .lock()
            .unwrap()
            .insert((scope.clone(), key.to_string()), value);
        Ok(())
    }

    async fn remove(&self, scope: &SettingsScope, key: &str) -> Result<Option<Value>, SettingsError> {
        Ok(self
            .values
            .lock()
            .unwrap()
            .remove(&(scope.clone(), key.to_string())))
    }

    async fn clear(&self, scope: &SettingsScope) -> Result<(), SettingsError> {
        self.values.lock().unwrap().retain(|(s, _), _| s != scope);
        Ok(())
    }
}

pub fn dm(author: &str, content: &str) -> ChatMessage {
    ChatMessage::new(next_message_id(), Author::new(author), Channel::direct(author), content)
}

pub fn group(author: &str, content: &str) -> ChatMessage {
    ChatMessage::new(
        next_message_id(),
        Author::new(author),
        Channel::guild("room", "room"),
        content,
    )
}

fn next_message_id() -> String {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    format!("msg-{}", NEXT.fetch_add(1, Ordering::SeqCst))
}

pub fn invocation(transport: &Arc<FakeTransport>, message: ChatMessage) -> CommandInvocation {
    let transport: Arc<dyn ChatTransport> = transport.clone();
    CommandInvocation::new(message, transport, Arc::new(Default::default()))
}

/// Command that records the arguments it was run with and replies with them.
pub struct RecordingCommand {
    info: CommandInfo,
    pub calls: Mutex<Vec<CommandArgs>>,
}

impl RecordingCommand {
    pub fn new(info: CommandInfo) -> Arc<Self> {
        Arc::new(Self {
            info,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<CommandArgs> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Command for RecordingCommand {
    fn info(&self) -> &CommandInfo {
        &self.info
    }

    async fn run(
        &self,
        invocation: &CommandInvocation,
        args: CommandArgs,
        _from_pattern: bool,
    ) -> Result<Vec<SentMessage>, CommandError> {
        let text = match &args {
            CommandArgs::Single(s) => format!("ran {} with {s}", self.info.name),
            CommandArgs::Multiple(tokens) => format!("ran {} with {}", self.info.name, tokens.join("|")),
            CommandArgs::Collected(values) => {
                let rendered: Vec<String> = values.iter().map(|(k, v)| format!("{k}={v}")).collect();
                format!("ran {} with {}", self.info.name, rendered.join(","))
            }
            CommandArgs::Pattern(groups) => {
                format!("ran {} with {} groups", self.info.name, groups.len())
            }
        };
        self.calls.lock().unwrap().push(args);
        Ok(vec![invocation.reply(&text).await?])
    }
}

/// Command that always fails with the given error text.
pub struct FailingCommand {
    info: CommandInfo,
    message: String,
    friendly: bool,
}

impl FailingCommand {
    pub fn new(name: &str, message: &str, friendly: bool) -> Arc<Self> {
        Arc::new(Self {
            info: CommandInfo::new(name, "test", "Always fails."),
            message: message.to_string(),
            friendly,
        })
    }
}

#[async_trait]
impl Command for FailingCommand {
    fn info(&self) -> &CommandInfo {
        &self.info
    }

    async fn run(
        &self,
        _invocation: &CommandInvocation,
        _args: CommandArgs,
        _from_pattern: bool,
    ) -> Result<Vec<SentMessage>, CommandError> {
        if self.friendly {
            Err(CommandError::friendly(self.message.clone()))
        } else {
            Err(anyhow::anyhow!("{}", self.message).into())
        }
    }
}

pub fn integer(key: &str) -> ArgumentInfo {
    ArgumentInfo::new(key, format!("Enter {key}.")).of_type("integer")
}

pub fn ints(values: &[i64]) -> ArgValue {
    ArgValue::List(values.iter().copied().map(ArgValue::Integer).collect())
}

pub fn registry(commands: Vec<Arc<dyn Command>>) -> Arc<CommandRegistry> {
    let mut registry = CommandRegistry::new(TypeRegistry::with_defaults());
    for command in commands {
        registry.register(command).unwrap();
    }
    Arc::new(registry)
}

pub fn dispatcher(
    transport: &Arc<FakeTransport>,
    commands: Vec<Arc<dyn Command>>,
    options: DispatcherOptions,
) -> CommandDispatcher {
    let transport: Arc<dyn ChatTransport> = transport.clone();
    CommandDispatcher::new(transport, registry(commands), MapSettings::new(), options)
}
