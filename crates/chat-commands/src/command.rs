//! Command declarations and the command trait.

use crate::argument::{ArgumentInfo, ArgumentValues};
use crate::error::CommandError;
use crate::invocation::CommandInvocation;
use crate::message::SentMessage;
use crate::throttle::Throttling;
use async_trait::async_trait;

/// How the argument string is handed to a command without declared arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArgsType {
    /// The whole trimmed argument string.
    #[default]
    Single,
    /// The argument string split into tokens.
    Multiple,
}

/// Static description of a command.
#[derive(Debug, Clone)]
pub struct CommandInfo {
    pub name: String,
    pub aliases: Vec<String>,
    pub group: String,
    pub description: String,
    /// Argument format shown in usage text, e.g. `<amount> [note]`.
    pub format: Option<String>,
    pub details: Option<String>,
    pub guild_only: bool,
    pub nsfw: bool,
    pub owner_only: bool,
    /// Guarded commands cannot be disabled.
    pub guarded: bool,
    /// Permissions the bot needs in the channel.
    pub client_permissions: Vec<String>,
    pub throttling: Option<Throttling>,
    pub args: Vec<ArgumentInfo>,
    pub args_type: ArgsType,
    pub args_single_quotes: bool,
    /// Overrides the dispatcher's prompt limit for this command.
    pub args_prompt_limit: Option<usize>,
    /// Regexes that trigger the command on any matching message.
    pub patterns: Vec<String>,
    /// Whether `prefix name` style invocations are recognised.
    pub default_handling: bool,
}

impl CommandInfo {
    pub fn new(name: impl Into<String>, group: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            group: group.into(),
            description: description.into(),
            format: None,
            details: None,
            guild_only: false,
            nsfw: false,
            owner_only: false,
            guarded: false,
            client_permissions: Vec::new(),
            throttling: None,
            args: Vec::new(),
            args_type: ArgsType::Single,
            args_single_quotes: true,
            args_prompt_limit: None,
            patterns: Vec::new(),
            default_handling: true,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn guild_only(mut self) -> Self {
        self.guild_only = true;
        self
    }

    pub fn nsfw(mut self) -> Self {
        self.nsfw = true;
        self
    }

    pub fn owner_only(mut self) -> Self {
        self.owner_only = true;
        self
    }

    pub fn guarded(mut self) -> Self {
        self.guarded = true;
        self
    }

    pub fn client_permission(mut self, permission: impl Into<String>) -> Self {
        self.client_permissions.push(permission.into());
        self
    }

    pub fn throttling(mut self, usages: u32, duration: u64) -> Self {
        self.throttling = Some(Throttling::new(usages, duration));
        self
    }

    pub fn arg(mut self, arg: ArgumentInfo) -> Self {
        self.args.push(arg);
        self
    }

    pub fn args_type(mut self, args_type: ArgsType) -> Self {
        self.args_type = args_type;
        self
    }

    pub fn args_single_quotes(mut self, allow: bool) -> Self {
        self.args_single_quotes = allow;
        self
    }

    pub fn args_prompt_limit(mut self, limit: usize) -> Self {
        self.args_prompt_limit = Some(limit);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    pub fn without_default_handling(mut self) -> Self {
        self.default_handling = false;
        self
    }

    /// Usage text for this command with `arg_string`, or its declared format.
    pub fn usage(&self, arg_string: Option<&str>, prefix: Option<&str>, mention: Option<&str>) -> String {
        let args = arg_string.or(self.format.as_deref()).unwrap_or_default();
        let command = if args.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, args)
        };
        any_usage(&command, prefix, mention)
    }
}

/// Usage text for running `command` with `prefix` and/or by mentioning `mention`.
///
/// ```
/// use chat_commands::any_usage;
///
/// assert_eq!(any_usage("help", Some("!"), None), "`!help`");
/// assert_eq!(any_usage("help", None, None), "`help`");
/// ```
pub fn any_usage(command: &str, prefix: Option<&str>, mention: Option<&str>) -> String {
    let command = command.replace(' ', "\u{a0}");
    let prefix = prefix.filter(|p| !p.is_empty());
    if prefix.is_none() && mention.is_none() {
        return format!("`{command}`");
    }

    let mut usage = String::new();
    if let Some(prefix) = prefix {
        let mut prefix = prefix.to_string();
        if prefix.chars().count() > 1 && !prefix.ends_with(' ') {
            prefix.push(' ');
        }
        usage.push_str(&format!("`{}{}`", prefix.replace(' ', "\u{a0}"), command));
    }
    if let Some(mention) = mention {
        if !usage.is_empty() {
            usage.push_str(" or ");
        }
        usage.push_str(&format!("`@{}\u{a0}{}`", mention.replace(' ', "\u{a0}"), command));
    }
    usage
}

/// Result of a permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionCheck {
    Granted,
    Denied,
    /// Denied with a message for the user.
    DeniedWith(String),
}

/// Arguments handed to [`Command::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum CommandArgs {
    /// Trimmed argument string with wrapping quotes removed.
    Single(String),
    Multiple(Vec<String>),
    /// Values obtained for the declared arguments.
    Collected(ArgumentValues),
    /// Capture groups of the matching command pattern.
    Pattern(Vec<Option<String>>),
}

#[async_trait]
pub trait Command: Send + Sync {
    fn info(&self) -> &CommandInfo;

    /// Whether the invoking user may run this command.
    async fn has_permission(&self, invocation: &CommandInvocation) -> PermissionCheck {
        let info = self.info();
        if info.owner_only && !invocation.is_owner() {
            return PermissionCheck::DeniedWith(format!(
                "The `{}` command can only be used by the bot owner.",
                info.name
            ));
        }
        PermissionCheck::Granted
    }

    /// Run the command, returning the messages it sent.
    async fn run(
        &self,
        invocation: &CommandInvocation,
        args: CommandArgs,
        from_pattern: bool,
    ) -> Result<Vec<SentMessage>, CommandError>;
}
