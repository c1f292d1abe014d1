//! Chat transport over the Signal REST API.

use async_trait::async_trait;
use chat_commands::{
    Author, Channel, ChatMessage, ChatTransport, MessageId, ReplyFilter, SentMessage,
    TransportError,
};
use signal_client::{BotMessage, SignalClient};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};

/// Inbound messages kept for quoting replies and resolving edits.
const RECENT_CAPACITY: usize = 512;
const INBOUND_CAPACITY: usize = 256;

/// A received message, and for edits the version it replaces.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub message: ChatMessage,
    pub previous: Option<ChatMessage>,
}

#[derive(Default)]
struct Recent {
    order: VecDeque<MessageId>,
    messages: HashMap<MessageId, (ChatMessage, BotMessage)>,
}

impl Recent {
    fn insert(&mut self, message: ChatMessage, raw: BotMessage) -> Option<ChatMessage> {
        let id = message.id.clone();
        let previous = self.messages.insert(id.clone(), (message, raw));
        if previous.is_none() {
            self.order.push_back(id);
            while self.order.len() > RECENT_CAPACITY {
                if let Some(oldest) = self.order.pop_front() {
                    self.messages.remove(&oldest);
                }
            }
        }
        previous.map(|(message, _)| message)
    }
}

/// [`ChatTransport`] backed by a [`SignalClient`].
///
/// Inbound messages enter through [`SignalTransport::record`], then reach
/// argument prompts waiting in [`ChatTransport::collect_one`] once published.
pub struct SignalTransport {
    client: SignalClient,
    account: String,
    inbound: broadcast::Sender<ChatMessage>,
    recent: Mutex<Recent>,
}

impl SignalTransport {
    pub fn new(client: SignalClient) -> Self {
        let (inbound, _) = broadcast::channel(INBOUND_CAPACITY);
        Self {
            account: client.phone_number().to_string(),
            client,
            inbound,
            recent: Mutex::new(Recent::default()),
        }
    }

    /// Convert a received Signal message and remember it for quoting and edits.
    pub fn record(&self, raw: BotMessage) -> Inbound {
        let message = self.to_chat_message(&raw);
        let previous = self.recent().insert(message.clone(), raw);
        debug!(message_id = %message.id, edit = previous.is_some(), "Recorded message");
        Inbound { message, previous }
    }

    /// Hand a recorded message to prompts waiting in [`ChatTransport::collect_one`].
    pub fn publish(&self, message: &ChatMessage) {
        // Nobody waiting is the common case.
        let _ = self.inbound.send(message.clone());
    }

    /// Stable id of a Signal message: author and original timestamp.
    pub fn message_id(raw: &BotMessage) -> MessageId {
        MessageId::new(format!("{}:{}", raw.source, raw.original_timestamp()))
    }

    fn to_chat_message(&self, raw: &BotMessage) -> ChatMessage {
        let channel = match &raw.group_id {
            Some(group) => Channel::guild(group.clone(), group.clone()),
            None => Channel::direct(raw.source.clone()),
        };
        let author = Author {
            id: raw.source.clone(),
            name: raw.source_name.clone(),
            bot: false,
        };
        let content = raw.text_with_mentions(|mention| {
            if mention.refers_to(&self.account) {
                format!("<@{}>", self.account)
            } else {
                let name = mention
                    .name
                    .as_deref()
                    .or(mention.number.as_deref())
                    .unwrap_or("someone");
                format!("@{name}")
            }
        });

        ChatMessage {
            id: Self::message_id(raw),
            author,
            channel,
            content,
            timestamp: raw.sent_at(),
        }
    }

    fn recent(&self) -> MutexGuard<'_, Recent> {
        self.recent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn raw_message(&self, id: &MessageId) -> Option<BotMessage> {
        self.recent().messages.get(id).map(|(_, raw)| raw.clone())
    }
}

fn sent_timestamp(message: &SentMessage) -> Result<i64, String> {
    message
        .id
        .as_str()
        .parse()
        .map_err(|_| format!("not a Signal message id: {}", message.id))
}

#[async_trait]
impl ChatTransport for SignalTransport {
    fn user_id(&self) -> &str {
        &self.account
    }

    #[instrument(skip(self, content), fields(channel = %channel.id))]
    async fn send(&self, channel: &Channel, content: &str) -> Result<SentMessage, TransportError> {
        let timestamp = self
            .client
            .send(&channel.id, content)
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;
        Ok(SentMessage {
            id: MessageId::new(timestamp.to_string()),
            channel: channel.clone(),
            content: content.to_string(),
        })
    }

    #[instrument(skip(self, original, content), fields(message_id = %original.id))]
    async fn reply(
        &self,
        original: &ChatMessage,
        content: &str,
    ) -> Result<SentMessage, TransportError> {
        let Some(raw) = self.raw_message(&original.id) else {
            return self.send(&original.channel, content).await;
        };
        let timestamp = self
            .client
            .reply(&raw, content)
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;
        Ok(SentMessage {
            id: MessageId::new(timestamp.to_string()),
            channel: original.channel.clone(),
            content: content.to_string(),
        })
    }

    #[instrument(skip(self, message, content), fields(message_id = %message.id))]
    async fn edit(
        &self,
        message: &SentMessage,
        content: &str,
    ) -> Result<SentMessage, TransportError> {
        let target = sent_timestamp(message).map_err(TransportError::Edit)?;
        self.client
            .edit(&message.channel.id, target, content)
            .await
            .map_err(|e| TransportError::Edit(e.to_string()))?;
        // Later edits still target the original timestamp.
        Ok(SentMessage {
            content: content.to_string(),
            ..message.clone()
        })
    }

    #[instrument(skip(self, message), fields(message_id = %message.id))]
    async fn delete(&self, message: &SentMessage) -> Result<(), TransportError> {
        let timestamp = sent_timestamp(message).map_err(TransportError::Delete)?;
        self.client
            .remote_delete(&message.channel.id, timestamp)
            .await
            .map_err(|e| TransportError::Delete(e.to_string()))
    }

    async fn collect_one(
        &self,
        filter: &ReplyFilter,
        wait: Duration,
    ) -> Result<Option<ChatMessage>, TransportError> {
        let mut inbound = self.inbound.subscribe();
        let next_match = async {
            loop {
                match inbound.recv().await {
                    Ok(message) if filter.matches(&message) => return Ok(Some(message)),
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Reply collector lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(TransportError::Receive("inbound channel closed".into()))
                    }
                }
            }
        };

        match tokio::time::timeout(wait, next_match).await {
            Ok(result) => result,
            Err(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_client::Mention;

    const BOT: &str = "+15550000000";

    fn transport() -> SignalTransport {
        SignalTransport::new(SignalClient::new("http://127.0.0.1:9", BOT).unwrap())
    }

    fn raw(source: &str, text: &str, timestamp: i64) -> BotMessage {
        BotMessage {
            source: source.to_string(),
            source_name: Some("Alice".into()),
            text: text.to_string(),
            timestamp,
            is_group: false,
            group_id: None,
            mentions: Vec::new(),
            edit_target: None,
            receiving_account: BOT.to_string(),
        }
    }

    #[test]
    fn test_record_converts_direct_message() {
        let transport = transport();
        let inbound = transport.record(raw("+1555", "!ping", 1000));

        let message = inbound.message;
        assert_eq!(message.id.as_str(), "+1555:1000");
        assert_eq!(message.author.display_name(), "Alice");
        assert!(message.channel.is_direct());
        assert_eq!(message.channel.id, "+1555");
        assert_eq!(message.content, "!ping");
        assert!(inbound.previous.is_none());
    }

    #[test]
    fn test_group_message_uses_group_channel() {
        let transport = transport();
        let mut msg = raw("+1555", "hi", 1);
        msg.is_group = true;
        msg.group_id = Some("grp".into());

        let message = transport.record(msg).message;
        assert_eq!(message.channel.id, "grp");
        assert_eq!(message.guild_id(), Some("grp"));
    }

    #[test]
    fn test_bot_mention_becomes_mention_token() {
        let transport = transport();
        let mut msg = raw("+1555", "\u{FFFC} help", 1);
        msg.mentions = vec![Mention {
            name: None,
            number: Some(BOT.into()),
            uuid: None,
            start: 0,
            length: 1,
        }];

        assert_eq!(transport.record(msg).message.content, format!("<@{BOT}> help"));
    }

    #[test]
    fn test_edit_returns_previous_version() {
        let transport = transport();
        transport.record(raw("+1555", "!echo hi", 1000));

        let mut edit = raw("+1555", "!echo bye", 2000);
        edit.edit_target = Some(1000);
        let inbound = transport.record(edit);

        assert_eq!(inbound.message.id.as_str(), "+1555:1000");
        assert_eq!(inbound.previous.unwrap().content, "!echo hi");
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_one_times_out() {
        let transport = transport();
        let filter = ReplyFilter {
            channel_id: "+1555".into(),
            author_id: "+1555".into(),
        };

        let reply = transport
            .collect_one(&filter, Duration::from_secs(30))
            .await
            .unwrap();
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn test_collect_one_receives_matching_reply() {
        let transport = std::sync::Arc::new(transport());
        let filter = ReplyFilter {
            channel_id: "+1555".into(),
            author_id: "+1555".into(),
        };

        let waiting = {
            let transport = transport.clone();
            tokio::spawn(async move { transport.collect_one(&filter, Duration::from_secs(5)).await })
        };
        tokio::task::yield_now().await;
        for message in [raw("+1666", "not me", 1), raw("+1555", "42", 2)] {
            let inbound = transport.record(message);
            transport.publish(&inbound.message);
        }

        let reply = waiting.await.unwrap().unwrap().unwrap();
        assert_eq!(reply.content, "42");
    }
}
