//! Chat transport boundary.

use crate::message::{Channel, ChatMessage, SentMessage};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Send failed: {0}")]
    Send(String),

    #[error("Edit failed: {0}")]
    Edit(String),

    #[error("Delete failed: {0}")]
    Delete(String),

    #[error("Receive failed: {0}")]
    Receive(String),
}

/// Selects the reply an acquisition is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyFilter {
    pub channel_id: String,
    pub author_id: String,
}

impl ReplyFilter {
    /// Replies by the author of `message` in the same channel.
    pub fn for_message(message: &ChatMessage) -> Self {
        Self {
            channel_id: message.channel.id.clone(),
            author_id: message.author.id.clone(),
        }
    }

    pub fn matches(&self, message: &ChatMessage) -> bool {
        message.channel.id == self.channel_id && message.author.id == self.author_id
    }
}

/// Sending, editing and collecting chat messages.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Account id of the bot itself.
    fn user_id(&self) -> &str;

    /// Send a plain message to a channel.
    async fn send(&self, channel: &Channel, content: &str) -> Result<SentMessage, TransportError>;

    /// Send a message addressed to the author of `original`.
    async fn reply(
        &self,
        original: &ChatMessage,
        content: &str,
    ) -> Result<SentMessage, TransportError> {
        self.send(&original.channel, content).await
    }

    /// Send a direct message to a user.
    async fn direct(&self, user_id: &str, content: &str) -> Result<SentMessage, TransportError> {
        self.send(&Channel::direct(user_id), content).await
    }

    /// Replace the content of a message sent earlier.
    async fn edit(
        &self,
        message: &SentMessage,
        content: &str,
    ) -> Result<SentMessage, TransportError>;

    /// Delete a message sent earlier.
    async fn delete(&self, message: &SentMessage) -> Result<(), TransportError>;

    /// Wait up to `wait` for one message matching `filter`.
    ///
    /// Returns `Ok(None)` when the wait elapses without a match.
    async fn collect_one(
        &self,
        filter: &ReplyFilter,
        wait: Duration,
    ) -> Result<Option<ChatMessage>, TransportError>;

    /// Permissions from `required` the bot lacks in `channel`.
    async fn missing_permissions(
        &self,
        _channel: &Channel,
        _required: &[String],
    ) -> Result<Vec<String>, TransportError> {
        Ok(Vec::new())
    }
}
