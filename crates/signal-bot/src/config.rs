//! Application configuration loaded from environment variables.

use anyhow::{Context, Result};
use chat_commands::DispatcherOptions;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Signal configuration
    pub signal: SignalConfig,

    /// Bot configuration
    #[serde(default)]
    pub bot: BotConfig,

    /// Command dispatch configuration
    #[serde(default)]
    pub commands: CommandsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignalConfig {
    /// Signal CLI REST API endpoint
    #[serde(default = "default_signal_service")]
    pub service_url: String,

    /// The bot's registered phone number
    pub phone_number: String,

    /// Bearer token for the REST API, if it requires one
    #[serde(default)]
    pub api_token: Option<SecretString>,

    /// Poll interval for messages
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Prefix for commands; empty means mention-only
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Bot owners, as a comma-separated list of phone numbers
    #[serde(default, deserialize_with = "comma_list")]
    pub owners: Vec<String>,

    /// Invite shown in error reports
    #[serde(default)]
    pub invite: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandsConfig {
    /// How long command responses stay editable; zero disables edit handling
    #[serde(default = "default_editable_duration", with = "humantime_serde")]
    pub editable_duration: Duration,

    /// Maximum prompts per argument; unset means unlimited
    #[serde(default)]
    pub prompt_limit: Option<usize>,

    #[serde(default = "default_true")]
    pub non_command_editable: bool,

    #[serde(default = "default_true")]
    pub unknown_command_response: bool,

    #[serde(default = "default_true")]
    pub blocked_message_pattern: bool,

    #[serde(default = "default_true")]
    pub throttling_message_pattern: bool,
}

// Default implementations
impl Default for BotConfig {
    fn default() -> Self {
        Self {
            command_prefix: default_command_prefix(),
            owners: Vec::new(),
            invite: None,
            log_level: default_log_level(),
        }
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            editable_duration: default_editable_duration(),
            prompt_limit: None,
            non_command_editable: true,
            unknown_command_response: true,
            blocked_message_pattern: true,
            throttling_message_pattern: true,
        }
    }
}

// Default value functions
fn default_signal_service() -> String {
    "http://signal-api:8080".into()
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(200)
}

fn default_command_prefix() -> String {
    "!".into()
}

fn default_editable_duration() -> Duration {
    Duration::from_secs(30)
}

fn default_log_level() -> String {
    "info".into()
}

fn default_true() -> bool {
    true
}

fn comma_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect())
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();
        Self::from_source(config::Environment::default())
    }

    fn from_source(environment: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(
                environment
                    .separator("__")
                    // try_parsing(true) would parse +16504928286 as a number and
                    // strip the + prefix. Keep strings as strings.
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// The configured prefix, `None` when commands are mention-only.
    pub fn default_prefix(&self) -> Option<String> {
        Some(self.bot.command_prefix.clone()).filter(|p| !p.is_empty())
    }

    /// Dispatcher options from the bot and command sections.
    pub fn dispatcher_options(&self) -> DispatcherOptions {
        DispatcherOptions {
            default_prefix: self.default_prefix(),
            owners: self.bot.owners.clone(),
            invite: self.bot.invite.clone(),
            editable_duration: self.commands.editable_duration,
            prompt_limit: self.commands.prompt_limit,
            non_command_editable: self.commands.non_command_editable,
            unknown_command_response: self.commands.unknown_command_response,
            blocked_message_pattern: self.commands.blocked_message_pattern,
            throttling_message_pattern: self.commands.throttling_message_pattern,
        }
    }
}
