//! Settings storage boundary.

use crate::message::ChatMessage;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Settings key of the command prefix.
pub const PREFIX_KEY: &str = "commandPrefix";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Where a setting applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SettingsScope {
    Global,
    Guild(String),
}

impl SettingsScope {
    /// Guild scope of the message, or global for direct messages.
    pub fn for_message(message: &ChatMessage) -> Self {
        match message.guild_id() {
            Some(id) => Self::Guild(id.to_string()),
            None => Self::Global,
        }
    }
}

/// Key/value settings per scope.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn get(&self, scope: &SettingsScope, key: &str) -> Result<Option<Value>, SettingsError>;

    async fn set(&self, scope: &SettingsScope, key: &str, value: Value) -> Result<(), SettingsError>;

    /// Remove a setting, returning the old value.
    async fn remove(&self, scope: &SettingsScope, key: &str) -> Result<Option<Value>, SettingsError>;

    /// Remove every setting of a scope.
    async fn clear(&self, scope: &SettingsScope) -> Result<(), SettingsError>;
}

/// Command prefix in effect for `scope`.
///
/// A guild without its own prefix uses the global one, then `default`.
/// A stored `null` means no prefix (mentions only); an empty string falls
/// back to `default`.
pub async fn resolve_prefix(
    provider: &dyn SettingsProvider,
    scope: &SettingsScope,
    default: Option<&str>,
) -> Result<Option<String>, SettingsError> {
    let mut stored = provider.get(scope, PREFIX_KEY).await?;
    if stored.is_none() && *scope != SettingsScope::Global {
        stored = provider.get(&SettingsScope::Global, PREFIX_KEY).await?;
    }

    Ok(match stored {
        None => default.map(str::to_string),
        Some(Value::Null) => None,
        Some(Value::String(prefix)) if prefix.is_empty() => default.map(str::to_string),
        Some(Value::String(prefix)) => Some(prefix),
        Some(other) => Some(other.to_string()),
    })
}
