//! Help command - lists commands or describes one.

use async_trait::async_trait;
use chat_commands::{
    any_usage, ArgumentInfo, Command, CommandArgs, CommandError, CommandInfo, CommandInvocation,
    RegisteredCommand, SentMessage,
};
use std::sync::Arc;

/// More matches than this are not listed.
const MAX_LISTED_MATCHES: usize = 15;

pub struct HelpCommand {
    info: CommandInfo,
}

impl HelpCommand {
    pub fn new() -> Self {
        let info = CommandInfo::new(
            "help",
            "util",
            "Displays a list of available commands, or detailed information for a specified command.",
        )
        .alias("commands")
        .format("[command]")
        .details(
            "The command may be part of a command name or a whole command name. \
             If it isn't specified, all available commands will be listed.",
        )
        .guarded()
        .arg(
            ArgumentInfo::new("command", "Which command would you like to view the help for?")
                .of_type("string")
                .default(""),
        );
        Self { info }
    }

    fn describe(invocation: &CommandInvocation, command: &RegisteredCommand) -> String {
        let info = command.command.info();
        let mut help = format!("__Command **{}**:__ {}", info.name, info.description);
        if info.guild_only {
            help.push_str(" (Usable only in groups)");
        }
        if info.nsfw {
            help.push_str(" (NSFW)");
        }

        let format = match &info.format {
            Some(format) => format!("{} {}", info.name, format),
            None => info.name.clone(),
        };
        help.push_str(&format!("\n\n**Format:** {}", invocation.usage(&format)));
        if !info.aliases.is_empty() {
            help.push_str(&format!("\n**Aliases:** {}", info.aliases.join(", ")));
        }
        help.push_str(&format!("\n**Group:** {}", info.group));
        if let Some(details) = &info.details {
            help.push_str(&format!("\n**Details:** {details}"));
        }
        help
    }

    fn usable(invocation: &CommandInvocation, command: &RegisteredCommand) -> bool {
        let info = command.command.info();
        let message = invocation.message();
        if info.guild_only && message.channel.is_direct() {
            return false;
        }
        if info.owner_only && !invocation.is_owner() {
            return false;
        }
        invocation
            .registry()
            .map_or(true, |r| r.is_enabled_in(&info.name, message.guild_id()))
    }

    fn overview(&self, invocation: &CommandInvocation, commands: &[Arc<RegisteredCommand>], show_all: bool) -> String {
        let message = invocation.message();
        let where_ = if message.channel.is_direct() { "any group" } else { "this group" };
        let mut text = format!(
            "To run a command in {where_}, use {}. For example, {}.\n\
             To run a command in this DM, simply use {} with no prefix.\n\
             Use {} to view detailed information about a specific command.\n\
             Use {} to view a list of *all* commands, not just available ones.\n\n",
            invocation.usage("command"),
            invocation.usage("prefix"),
            any_usage("command", None, None),
            self.info.usage(Some("<command>"), None, None),
            self.info.usage(Some("all"), None, None),
        );

        let heading = if show_all {
            "All commands".to_string()
        } else if message.channel.is_direct() {
            "Available commands in this DM".to_string()
        } else {
            "Available commands in this group".to_string()
        };
        text.push_str(&format!("__**{heading}**__"));

        let mut groups: Vec<&str> = Vec::new();
        for command in commands {
            let group = command.command.info().group.as_str();
            if !groups.contains(&group) {
                groups.push(group);
            }
        }

        for group in groups {
            let lines: Vec<String> = commands
                .iter()
                .filter(|c| c.command.info().group == group)
                .filter(|c| show_all || Self::usable(invocation, c))
                .map(|c| {
                    let info = c.command.info();
                    let nsfw = if info.nsfw { " (NSFW)" } else { "" };
                    format!("**{}:** {}{}", info.name, info.description, nsfw)
                })
                .collect();
            if !lines.is_empty() {
                text.push_str(&format!("\n\n__{group}__\n{}", lines.join("\n")));
            }
        }
        text
    }
}

impl Default for HelpCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Command for HelpCommand {
    fn info(&self) -> &CommandInfo {
        &self.info
    }

    async fn run(
        &self,
        invocation: &CommandInvocation,
        args: CommandArgs,
        _from_pattern: bool,
    ) -> Result<Vec<SentMessage>, CommandError> {
        let search = match &args {
            CommandArgs::Collected(values) => values
                .get("command")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .trim()
                .to_string(),
            _ => String::new(),
        };
        let Some(registry) = invocation.registry() else {
            return Err(CommandError::friendly("No commands are registered."));
        };

        let show_all = search.eq_ignore_ascii_case("all");
        let mut sent = Vec::new();

        let help = if search.is_empty() || show_all {
            self.overview(invocation, registry.commands(), show_all)
        } else {
            let matches = registry.find_commands(&search, false);
            match matches.as_slice() {
                [command] => Self::describe(invocation, command),
                [] => {
                    let text = format!(
                        "Unable to identify command. Use {} to view the list of all commands.",
                        invocation.usage("help")
                    );
                    sent.push(invocation.reply(&text).await?);
                    return Ok(sent);
                }
                many if many.len() > MAX_LISTED_MATCHES => {
                    sent.push(
                        invocation
                            .reply("Multiple commands found. Please be more specific.")
                            .await?,
                    );
                    return Ok(sent);
                }
                many => {
                    let names: Vec<String> =
                        many.iter().map(|c| format!("\"{}\"", c.name())).collect();
                    let text = format!(
                        "Multiple commands found, please be more specific: {}",
                        names.join(", ")
                    );
                    sent.push(invocation.reply(&text).await?);
                    return Ok(sent);
                }
            }
        };

        sent.push(invocation.direct(&help).await?);
        if !invocation.message().channel.is_direct() {
            sent.push(invocation.reply("Sent you a DM with information.").await?);
        }
        Ok(sent)
    }
}
