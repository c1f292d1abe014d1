//! Registered commands.

use crate::argument::ArgumentCollector;
use crate::command::Command;
use crate::error::ConfigError;
use crate::types::TypeRegistry;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// A command with its argument collector and compiled patterns.
pub struct RegisteredCommand {
    pub command: Arc<dyn Command>,
    pub collector: Option<ArgumentCollector>,
    pub patterns: Vec<Regex>,
}

impl RegisteredCommand {
    pub fn name(&self) -> &str {
        &self.command.info().name
    }

    fn answers_to(&self, name: &str) -> bool {
        let info = self.command.info();
        info.name.eq_ignore_ascii_case(name)
            || info.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Debug for RegisteredCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredCommand")
            .field("name", &self.name())
            .field("collector", &self.collector)
            .field("patterns", &self.patterns.len())
            .finish()
    }
}

/// Commands by name, plus per-guild enabled state.
pub struct CommandRegistry {
    commands: Vec<Arc<RegisteredCommand>>,
    types: TypeRegistry,
    status: RwLock<HashMap<(String, Option<String>), bool>>,
}

impl CommandRegistry {
    pub fn new(types: TypeRegistry) -> Self {
        Self {
            commands: Vec::new(),
            types,
            status: RwLock::new(HashMap::new()),
        }
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Register a command, checking its name, aliases, arguments and patterns.
    pub fn register(&mut self, command: Arc<dyn Command>) -> Result<(), ConfigError> {
        let info = command.info().clone();
        if info.name.trim().is_empty() {
            return Err(ConfigError::MissingCommandName);
        }

        for name in std::iter::once(&info.name).chain(info.aliases.iter()) {
            if self.commands.iter().any(|existing| existing.answers_to(name)) {
                return Err(ConfigError::DuplicateCommand(name.clone()));
            }
        }

        let collector = if info.args.is_empty() {
            None
        } else {
            Some(ArgumentCollector::new(
                info.args.clone(),
                &self.types,
                info.args_prompt_limit,
            )?)
        };

        let patterns = info
            .patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ConfigError::InvalidPattern {
                        command: info.name.clone(),
                        pattern: pattern.clone(),
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(command = %info.name, group = %info.group, "Registered command");
        self.commands.push(Arc::new(RegisteredCommand {
            command,
            collector,
            patterns,
        }));
        Ok(())
    }

    pub fn commands(&self) -> &[Arc<RegisteredCommand>] {
        &self.commands
    }

    /// Commands matching `search` by name or alias.
    ///
    /// A non-exact search also matches names containing `search`; exact
    /// matches win when there are any.
    pub fn find_commands(&self, search: &str, exact: bool) -> Vec<Arc<RegisteredCommand>> {
        let search = search.to_lowercase();
        let exact_matches: Vec<_> = self
            .commands
            .iter()
            .filter(|c| c.answers_to(&search))
            .cloned()
            .collect();
        if exact || !exact_matches.is_empty() {
            return exact_matches;
        }

        self.commands
            .iter()
            .filter(|c| {
                let info = c.command.info();
                info.name.to_lowercase().contains(&search)
                    || info
                        .aliases
                        .iter()
                        .any(|alias| alias.to_lowercase().contains(&search))
            })
            .cloned()
            .collect()
    }

    /// Enable or disable a command, globally (`guild_id = None`) or in one guild.
    ///
    /// Returns `false` for guarded or unknown commands, which cannot be toggled.
    pub fn set_enabled(&self, name: &str, guild_id: Option<&str>, enabled: bool) -> bool {
        let Some(command) = self.find_commands(name, true).into_iter().next() else {
            return false;
        };
        if command.command.info().guarded {
            return false;
        }
        debug!(command = %command.name(), guild_id, enabled, "Command status changed");
        self.status
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((command.name().to_string(), guild_id.map(str::to_string)), enabled);
        true
    }

    /// Whether `name` is enabled in `guild_id`; guild state overrides global.
    pub fn is_enabled_in(&self, name: &str, guild_id: Option<&str>) -> bool {
        let status = self.status.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(guild) = guild_id {
            if let Some(enabled) = status.get(&(name.to_string(), Some(guild.to_string()))) {
                return *enabled;
            }
        }
        status.get(&(name.to_string(), None)).copied().unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::ArgumentInfo;
    use crate::command::{CommandArgs, CommandInfo};
    use crate::error::CommandError;
    use crate::invocation::CommandInvocation;
    use crate::message::SentMessage;
    use async_trait::async_trait;

    struct Noop(CommandInfo);

    #[async_trait]
    impl Command for Noop {
        fn info(&self) -> &CommandInfo {
            &self.0
        }

        async fn run(
            &self,
            _invocation: &CommandInvocation,
            _args: CommandArgs,
            _from_pattern: bool,
        ) -> Result<Vec<SentMessage>, CommandError> {
            Ok(Vec::new())
        }
    }

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new(TypeRegistry::with_defaults());
        registry
            .register(Arc::new(Noop(CommandInfo::new("help", "util", "Help.").alias("commands").guarded())))
            .unwrap();
        registry
            .register(Arc::new(Noop(CommandInfo::new("helpme", "util", "More help."))))
            .unwrap();
        registry
    }

    #[test]
    fn test_duplicate_alias_rejected() {
        let mut registry = registry();
        let err = registry
            .register(Arc::new(Noop(CommandInfo::new("list", "util", "List.").alias("Commands"))))
            .unwrap_err();
        assert_eq!(err, ConfigError::DuplicateCommand("Commands".into()));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let mut registry = registry();
        let err = registry
            .register(Arc::new(Noop(CommandInfo::new("bad", "util", "Bad.").pattern("("))))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_invalid_arguments_rejected() {
        let mut registry = registry();
        let info = CommandInfo::new("add", "math", "Adds.")
            .arg(ArgumentInfo::new("a", "A?").of_type("integer").default(1i64))
            .arg(ArgumentInfo::new("b", "B?").of_type("integer"));
        let err = registry.register(Arc::new(Noop(info))).unwrap_err();
        assert_eq!(err, ConfigError::RequiredAfterOptional("b".into()));
    }

    #[test]
    fn test_find_prefers_exact_match() {
        let registry = registry();
        let found = registry.find_commands("HELP", false);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name(), "help");

        assert_eq!(registry.find_commands("elp", false).len(), 2);
        assert!(registry.find_commands("elp", true).is_empty());
        assert_eq!(registry.find_commands("commands", true)[0].name(), "help");
    }

    #[test]
    fn test_enable_disable_per_guild() {
        let registry = registry();
        assert!(registry.set_enabled("helpme", Some("g1"), false));
        assert!(!registry.is_enabled_in("helpme", Some("g1")));
        assert!(registry.is_enabled_in("helpme", Some("g2")));

        assert!(registry.set_enabled("helpme", None, false));
        assert!(!registry.is_enabled_in("helpme", Some("g2")));

        assert!(!registry.set_enabled("help", None, false));
        assert!(registry.is_enabled_in("help", None));
    }
}
