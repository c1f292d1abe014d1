//! Platform-neutral message model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache key used for responses sent in direct messages.
pub const DM_KEY: &str = "dm";

/// Identifier of a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Author of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: Option<String>,
    /// Whether the author is an automated account.
    #[serde(default)]
    pub bot: bool,
}

impl Author {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            bot: false,
        }
    }

    /// Name to show in messages, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Guild (server / group) a channel belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildContext {
    pub id: String,
    /// Unavailable guilds are outage placeholders; messages from them are ignored.
    #[serde(default = "default_true")]
    pub available: bool,
}

/// Channel a message was posted in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    /// `None` for direct messages.
    pub guild: Option<GuildContext>,
    #[serde(default)]
    pub nsfw: bool,
}

impl Channel {
    /// A direct-message channel.
    pub fn direct(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            guild: None,
            nsfw: false,
        }
    }

    /// A channel inside a guild.
    pub fn guild(id: impl Into<String>, guild_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            guild: Some(GuildContext {
                id: guild_id.into(),
                available: true,
            }),
            nsfw: false,
        }
    }

    pub fn with_nsfw(mut self, nsfw: bool) -> Self {
        self.nsfw = nsfw;
        self
    }

    pub fn is_direct(&self) -> bool {
        self.guild.is_none()
    }

    pub fn guild_id(&self) -> Option<&str> {
        self.guild.as_ref().map(|g| g.id.as_str())
    }

    /// Key under which responses in this channel are cached.
    pub fn cache_key(&self) -> &str {
        if self.is_direct() {
            DM_KEY
        } else {
            &self.id
        }
    }
}

/// Inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub author: Author,
    pub channel: Channel,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(
        id: impl Into<String>,
        author: Author,
        channel: Channel,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::new(id),
            author,
            channel,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn guild_id(&self) -> Option<&str> {
        self.channel.guild_id()
    }
}

/// Message sent by the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub id: MessageId,
    pub channel: Channel,
    pub content: String,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key() {
        assert_eq!(Channel::direct("+1555").cache_key(), "dm");
        assert_eq!(Channel::guild("chan", "g1").cache_key(), "chan");
    }

    #[test]
    fn test_channel_deserialize_defaults() {
        let channel: Channel =
            serde_json::from_str(r#"{"id":"c1","guild":{"id":"g1"}}"#).unwrap();
        assert!(!channel.nsfw);
        assert!(channel.guild.unwrap().available);
    }
}
