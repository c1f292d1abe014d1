//! Framework error types.

use crate::settings::SettingsError;
use crate::transport::TransportError;
use thiserror::Error;

/// Invalid command or argument declaration, raised while registering.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Argument key must not be empty")]
    MissingKey,

    #[error("Argument `{0}` has an empty prompt")]
    MissingPrompt(String),

    #[error("Argument `{0}` needs a type or both a validate and a parse function")]
    MissingType(String),

    #[error("Argument `{key}` uses unregistered type `{type_id}`")]
    UnknownType { key: String, type_id: String },

    #[error("Argument `{0}` must wait at least one second for input")]
    InvalidWait(String),

    #[error("Argument `{0}` comes after an infinite argument")]
    ArgumentAfterInfinite(String),

    #[error("Required argument `{0}` comes after an optional argument")]
    RequiredAfterOptional(String),

    #[error("Duplicate argument key `{0}`")]
    DuplicateKey(String),

    #[error("Argument type `{0}` is already registered")]
    DuplicateType(String),

    #[error("Command name must not be empty")]
    MissingCommandName,

    #[error("Command name or alias `{0}` is already registered")]
    DuplicateCommand(String),

    #[error("Invalid pattern `{pattern}` for command `{command}`: {message}")]
    InvalidPattern {
        command: String,
        pattern: String,
        message: String,
    },

    #[error("Argument `{0}` uses custom functions and cannot be restored from a snapshot")]
    HooksNotRestorable(String),
}

/// Failure while obtaining an argument value.
#[derive(Error, Debug)]
pub enum ArgumentError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to parse `{key}`: {message}")]
    Parse { key: String, message: String },
}

/// Failure while running a command.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Shown to the invoking user as-is.
    #[error("{0}")]
    Friendly(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Execution(#[from] anyhow::Error),
}

impl CommandError {
    /// Create a friendly error.
    pub fn friendly(message: impl Into<String>) -> Self {
        Self::Friendly(message.into())
    }

    /// Short error class name used in user-facing error reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Friendly(_) => "FriendlyError",
            Self::Transport(_) => "TransportError",
            Self::Argument(_) => "ArgumentError",
            Self::Settings(_) => "SettingsError",
            Self::Execution(_) => "ExecutionError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::UnknownType {
            key: "amount".into(),
            type_id: "money".into(),
        };
        assert_eq!(
            err.to_string(),
            "Argument `amount` uses unregistered type `money`"
        );
    }

    #[test]
    fn test_command_error_kind() {
        assert_eq!(CommandError::friendly("nope").kind(), "FriendlyError");
        let err: CommandError = anyhow::anyhow!("boom").into();
        assert_eq!(err.kind(), "ExecutionError");
        assert_eq!(err.to_string(), "boom");
    }
}
