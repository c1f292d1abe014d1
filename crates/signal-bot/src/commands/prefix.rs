//! Prefix command - shows or changes the command prefix.

use async_trait::async_trait;
use chat_commands::{
    any_usage, resolve_prefix, ArgumentInfo, Command, CommandArgs, CommandError, CommandInfo,
    CommandInvocation, SentMessage, SettingsProvider, SettingsScope, PREFIX_KEY,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

pub struct PrefixCommand {
    info: CommandInfo,
    settings: Arc<dyn SettingsProvider>,
    default_prefix: Option<String>,
}

impl PrefixCommand {
    pub fn new(settings: Arc<dyn SettingsProvider>, default_prefix: Option<String>) -> Self {
        let info = CommandInfo::new("prefix", "util", "Shows or sets the command prefix.")
            .format("[prefix/\"default\"/\"none\"]")
            .details(
                "If no prefix is provided, the current prefix will be shown. \
                 If the prefix is \"default\", the prefix will be reset to the bot's default prefix. \
                 If the prefix is \"none\", the prefix will be removed entirely, only allowing mentions to run commands. \
                 Only the bot owner may change the prefix.",
            )
            .throttling(2, 3)
            .guarded()
            .arg(
                ArgumentInfo::new("prefix", "What would you like to set the bot's prefix to?")
                    .of_type("string")
                    .max(15.0)
                    .default(""),
            );
        Self {
            info,
            settings,
            default_prefix,
        }
    }

    fn run_hint(invocation: &CommandInvocation, prefix: Option<&str>) -> String {
        let mention = invocation.transport().user_id();
        any_usage("command", prefix, Some(mention))
    }
}

#[async_trait]
impl Command for PrefixCommand {
    fn info(&self) -> &CommandInfo {
        &self.info
    }

    async fn run(
        &self,
        invocation: &CommandInvocation,
        args: CommandArgs,
        _from_pattern: bool,
    ) -> Result<Vec<SentMessage>, CommandError> {
        let requested = match &args {
            CommandArgs::Collected(values) => values
                .get("prefix")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .trim()
                .to_string(),
            _ => String::new(),
        };
        let scope = SettingsScope::for_message(invocation.message());

        if requested.is_empty() {
            let prefix =
                resolve_prefix(self.settings.as_ref(), &scope, self.default_prefix.as_deref()).await?;
            let current = match &prefix {
                Some(prefix) => format!("The command prefix is `{prefix}`."),
                None => "There is no command prefix set.".to_string(),
            };
            let text = format!(
                "{current}\nTo run commands, use {}.",
                Self::run_hint(invocation, prefix.as_deref())
            );
            return Ok(vec![invocation.say(&text).await?]);
        }

        if !invocation.is_owner() {
            return Ok(vec![
                invocation
                    .reply("Only the bot owner may change the command prefix.")
                    .await?,
            ]);
        }

        let response = match requested.to_lowercase().as_str() {
            "default" => {
                self.settings.remove(&scope, PREFIX_KEY).await?;
                let prefix =
                    resolve_prefix(self.settings.as_ref(), &scope, self.default_prefix.as_deref())
                        .await?;
                let current = prefix
                    .as_deref()
                    .map(|p| format!("`{p}`"))
                    .unwrap_or_else(|| "no prefix".to_string());
                info!(?scope, "Command prefix reset");
                (
                    format!("Reset the command prefix to the default (currently {current})."),
                    prefix,
                )
            }
            "none" => {
                self.settings.set(&scope, PREFIX_KEY, Value::Null).await?;
                info!(?scope, "Command prefix removed");
                ("Removed the command prefix entirely.".to_string(), None)
            }
            _ => {
                self.settings
                    .set(&scope, PREFIX_KEY, Value::String(requested.clone()))
                    .await?;
                info!(?scope, prefix = %requested, "Command prefix set");
                (format!("Set the command prefix to `{requested}`."), Some(requested))
            }
        };

        let (text, prefix) = response;
        let text = format!(
            "{text} To run commands use {}.",
            Self::run_hint(invocation, prefix.as_deref())
        );
        Ok(vec![invocation.reply(&text).await?])
    }
}
