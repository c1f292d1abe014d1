//! Signal API types.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder the REST API puts in message text where a mention sits.
pub const MENTION_PLACEHOLDER: char = '\u{FFFC}';

/// Incoming Signal message.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub envelope: Envelope,
    pub account: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub source: String,
    pub source_number: Option<String>,
    pub source_uuid: Option<String>,
    pub source_name: Option<String>,
    pub timestamp: i64,
    pub data_message: Option<DataMessage>,
    pub edit_message: Option<EditMessage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMessage {
    pub message: Option<String>,
    pub timestamp: i64,
    pub group_info: Option<GroupInfo>,
    #[serde(default)]
    pub mentions: Vec<Mention>,
}

/// Replacement text for an earlier message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditMessage {
    /// Timestamp of the message being edited.
    pub target_sent_timestamp: i64,
    pub data_message: DataMessage,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    pub group_id: String,
}

/// A mention inside message text; `start` and `length` count UTF-16 units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub name: Option<String>,
    pub number: Option<String>,
    pub uuid: Option<String>,
    pub start: usize,
    pub length: usize,
}

impl Mention {
    /// Whether this mention refers to `account` (phone number or uuid).
    pub fn refers_to(&self, account: &str) -> bool {
        self.number.as_deref() == Some(account)
            || self.uuid.as_deref() == Some(account)
            || self.name.as_deref() == Some(account)
    }
}

/// Outgoing message request.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    pub message: String,
    pub number: Option<String>,
    pub recipients: Option<Vec<String>>,
    /// Timestamp of an earlier message this one replaces.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_message: Option<String>,
}

impl SendMessageRequest {
    pub fn new(number: impl Into<String>, recipient: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            number: Some(number.into()),
            recipients: Some(vec![recipient.into()]),
            edit_timestamp: None,
            quote_timestamp: None,
            quote_author: None,
            quote_message: None,
        }
    }
}

/// Send message response.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default, deserialize_with = "timestamp_from_any")]
    pub timestamp: Option<i64>,
}

/// Request to delete a sent message for everyone.
#[derive(Debug, Clone, Serialize)]
pub struct RemoteDeleteRequest {
    pub recipient: String,
    pub timestamp: i64,
}

/// Account information.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub number: String,
    pub uuid: Option<String>,
    pub registered: bool,
}

/// Parsed message for bot processing.
#[derive(Debug, Clone)]
pub struct BotMessage {
    /// The phone number (or uuid) that sent the message.
    pub source: String,
    pub source_name: Option<String>,
    /// The message text.
    pub text: String,
    /// Message timestamp. For edits, the timestamp of the edit itself.
    pub timestamp: i64,
    /// Whether this is a group message.
    pub is_group: bool,
    /// Group ID if this is a group message.
    pub group_id: Option<String>,
    pub mentions: Vec<Mention>,
    /// For edits, the timestamp of the message being replaced.
    pub edit_target: Option<i64>,
    /// The bot's phone number that received this message.
    pub receiving_account: String,
}

impl BotMessage {
    /// Extract bot message from incoming envelope.
    ///
    /// Handles plain data messages and edits; other envelopes (receipts,
    /// typing indicators) yield `None`.
    pub fn from_incoming(msg: &IncomingMessage) -> Option<Self> {
        let envelope = &msg.envelope;
        let (data, edit_target) = match (&envelope.data_message, &envelope.edit_message) {
            (Some(data), _) => (data, None),
            (None, Some(edit)) => (&edit.data_message, Some(edit.target_sent_timestamp)),
            (None, None) => return None,
        };
        let text = data.message.clone()?;

        Some(Self {
            source: envelope.source.clone(),
            source_name: envelope.source_name.clone(),
            text,
            timestamp: envelope.timestamp,
            is_group: data.group_info.is_some(),
            group_id: data.group_info.as_ref().map(|g| g.group_id.clone()),
            mentions: data.mentions.clone(),
            edit_target,
            receiving_account: msg.account.clone(),
        })
    }

    /// Get the reply target (group ID or source number).
    pub fn reply_target(&self) -> &str {
        self.group_id.as_deref().unwrap_or(&self.source)
    }

    /// Timestamp identifying the message this one is or replaces.
    pub fn original_timestamp(&self) -> i64 {
        self.edit_target.unwrap_or(self.timestamp)
    }

    /// When this version of the message was sent; now if the timestamp is out of range.
    pub fn sent_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.timestamp)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// Text with each mention placeholder replaced by `render(mention)`.
    pub fn text_with_mentions(&self, render: impl Fn(&Mention) -> String) -> String {
        if self.mentions.is_empty() {
            return self.text.clone();
        }

        let units: Vec<u16> = self.text.encode_utf16().collect();
        let mut mentions: Vec<&Mention> = self.mentions.iter().collect();
        mentions.sort_by_key(|m| m.start);

        let mut out = String::with_capacity(self.text.len());
        let mut cursor = 0;
        for mention in mentions {
            let end = mention.start + mention.length;
            if mention.start < cursor || end > units.len() {
                continue;
            }
            out.push_str(&String::from_utf16_lossy(&units[cursor..mention.start]));
            out.push_str(&render(mention));
            cursor = end;
        }
        out.push_str(&String::from_utf16_lossy(&units[cursor..]));
        out
    }
}

/// The REST API reports timestamps as either strings or numbers.
fn timestamp_from_any<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
