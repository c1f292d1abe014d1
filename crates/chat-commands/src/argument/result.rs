use crate::message::{ChatMessage, SentMessage};
use crate::types::ArgValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an acquisition stopped without a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CancelReason {
    /// The user replied `cancel`, or `finish` with nothing collected.
    User,
    /// No reply arrived in time.
    Time,
    /// Too many prompts were sent.
    PromptLimit,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Time => "time",
            Self::PromptLimit => "promptLimit",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionOutcome {
    Value(ArgValue),
    Values(Vec<ArgValue>),
    Cancelled(CancelReason),
}

/// Result of obtaining one argument.
#[derive(Debug, Clone)]
pub struct AcquisitionResult {
    pub outcome: AcquisitionOutcome,
    /// Prompts sent by the bot, in order.
    pub prompts: Vec<SentMessage>,
    /// Replies from the user, in order.
    pub answers: Vec<ChatMessage>,
}

impl AcquisitionResult {
    pub fn cancelled(&self) -> Option<CancelReason> {
        match self.outcome {
            AcquisitionOutcome::Cancelled(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<&ArgValue> {
        match &self.outcome {
            AcquisitionOutcome::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn values(&self) -> Option<&[ArgValue]> {
        match &self.outcome {
            AcquisitionOutcome::Values(values) => Some(values),
            _ => None,
        }
    }
}

/// Collected argument values in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentValues {
    entries: Vec<(String, ArgValue)>,
}

impl ArgumentValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, key: impl Into<String>, value: ArgValue) {
        self.entries.push((key.into(), value));
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CollectionOutcome {
    Complete(ArgumentValues),
    Cancelled(CancelReason),
}

/// Result of obtaining every argument of a command.
#[derive(Debug, Clone)]
pub struct CollectionResult {
    pub outcome: CollectionOutcome,
    pub prompts: Vec<SentMessage>,
    pub answers: Vec<ChatMessage>,
}

impl CollectionResult {
    pub fn cancelled(&self) -> Option<CancelReason> {
        match self.outcome {
            CollectionOutcome::Cancelled(reason) => Some(reason),
            CollectionOutcome::Complete(_) => None,
        }
    }

    pub fn values(&self) -> Option<&ArgumentValues> {
        match &self.outcome {
            CollectionOutcome::Complete(values) => Some(values),
            CollectionOutcome::Cancelled(_) => None,
        }
    }
}
