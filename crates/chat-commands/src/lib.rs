//! Command framework for chat bots.
//!
//! Turns inbound chat messages into validated, typed command invocations.
//! The [`CommandDispatcher`] decides whether a message triggers a command and
//! gates it through inhibitors, permission checks and a per-user throttle.
//! Commands that declare arguments get them through an [`ArgumentCollector`],
//! which prompts the invoking user for missing or invalid values.

pub mod argument;
mod awaiting;
mod command;
mod dispatcher;
mod error;
mod events;
mod inhibitor;
mod invocation;
mod message;
mod registry;
pub mod sanitize;
mod settings;
mod throttle;
pub mod tokenize;
mod transport;
pub mod types;

#[cfg(test)]
mod test_support;

pub use argument::{
    AcquisitionOutcome, AcquisitionResult, ArgumentCollector, ArgumentInfo, ArgumentSnapshot,
    ArgumentSpec, ArgumentValues, CancelReason, CollectionOutcome, CollectionResult,
    ProvidedValue,
};
pub use awaiting::{AwaitingLease, AwaitingRegistry};
pub use command::{
    any_usage, ArgsType, Command, CommandArgs, CommandInfo, PermissionCheck,
};
pub use dispatcher::{CommandDispatcher, DispatchOutcome, DispatcherOptions};
pub use error::{ArgumentError, CommandError, ConfigError};
pub use events::{BlockReason, DispatchEvent};
pub use inhibitor::{inhibitor_fn, Inhibition, Inhibitor};
pub use invocation::{CommandInvocation, ResponseKind};
pub use message::{Author, Channel, ChatMessage, GuildContext, MessageId, SentMessage};
pub use registry::{CommandRegistry, RegisteredCommand};
pub use settings::{resolve_prefix, SettingsError, SettingsProvider, SettingsScope, PREFIX_KEY};
pub use throttle::{ThrottleDecision, Throttler, Throttling};
pub use transport::{ChatTransport, ReplyFilter, TransportError};
pub use types::{ArgValue, ArgumentType, TypeRegistry, Validation};
