//! Application error types.

use thiserror::Error;

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Signal error: {0}")]
    Signal(#[from] signal_client::SignalError),

    #[error("Signal account {0} is not registered")]
    Unregistered(String),

    #[error("Command setup error: {0}")]
    Commands(#[from] chat_commands::ConfigError),
}

/// Result type alias for application errors.
pub type AppResult<T> = Result<T, AppError>;
