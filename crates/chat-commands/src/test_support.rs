use crate::awaiting::AwaitingRegistry;
use crate::invocation::CommandInvocation;
use crate::message::{Author, Channel, ChatMessage, MessageId, SentMessage};
use crate::transport::{ChatTransport, ReplyFilter, TransportError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Transport that accepts everything and never receives replies.
pub struct NullTransport;

#[async_trait]
impl ChatTransport for NullTransport {
    fn user_id(&self) -> &str {
        "bot"
    }

    async fn send(&self, channel: &Channel, content: &str) -> Result<SentMessage, TransportError> {
        Ok(SentMessage {
            id: MessageId::new("sent"),
            channel: channel.clone(),
            content: content.to_string(),
        })
    }

    async fn edit(&self, message: &SentMessage, content: &str) -> Result<SentMessage, TransportError> {
        Ok(SentMessage {
            content: content.to_string(),
            ..message.clone()
        })
    }

    async fn delete(&self, _message: &SentMessage) -> Result<(), TransportError> {
        Ok(())
    }

    async fn collect_one(
        &self,
        _filter: &ReplyFilter,
        _wait: Duration,
    ) -> Result<Option<ChatMessage>, TransportError> {
        Ok(None)
    }
}

pub fn test_invocation(content: &str) -> CommandInvocation {
    let message = ChatMessage::new("m1", Author::new("alice"), Channel::direct("alice"), content);
    CommandInvocation::new(message, Arc::new(NullTransport), Arc::new(AwaitingRegistry::new()))
}
