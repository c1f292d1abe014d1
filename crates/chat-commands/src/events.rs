//! Notifications published by the dispatcher.

use crate::argument::CancelReason;
use crate::message::MessageId;
use std::fmt;

/// Why a command was not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    /// Blocked by an inhibitor with this reason.
    Inhibitor(String),
    GuildOnly,
    Nsfw,
    Permission,
    /// The bot lacks these permissions in the channel.
    ClientPermissions(Vec<String>),
    Throttling { remaining: u64 },
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inhibitor(reason) => f.write_str(reason),
            Self::GuildOnly => f.write_str("guildOnly"),
            Self::Nsfw => f.write_str("nsfw"),
            Self::Permission => f.write_str("permission"),
            Self::ClientPermissions(_) => f.write_str("clientPermissions"),
            Self::Throttling { .. } => f.write_str("throttling"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DispatchEvent {
    CommandBlocked {
        command: Option<String>,
        message_id: MessageId,
        reason: BlockReason,
    },
    UnknownCommand {
        message_id: MessageId,
    },
    CommandRun {
        command: String,
        message_id: MessageId,
        from_pattern: bool,
    },
    CommandError {
        command: String,
        message_id: MessageId,
        error: String,
    },
    CommandCancelled {
        command: String,
        message_id: MessageId,
        reason: CancelReason,
    },
}
