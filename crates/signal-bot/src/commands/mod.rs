//! Built-in bot commands.

mod help;
mod prefix;

pub use help::HelpCommand;
pub use prefix::PrefixCommand;

use chat_commands::{Command, SettingsProvider};
use std::sync::Arc;

/// The commands every bot ships with.
pub fn builtin_commands(
    settings: Arc<dyn SettingsProvider>,
    default_prefix: Option<String>,
) -> Vec<Arc<dyn Command>> {
    vec![
        Arc::new(HelpCommand::new()),
        Arc::new(PrefixCommand::new(settings, default_prefix)),
    ]
}
