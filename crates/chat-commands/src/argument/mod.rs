//! Command arguments: declarations, interactive acquisition and collection.

mod acquire;
mod collector;
mod result;
mod spec;

pub use acquire::ProvidedValue;
pub use collector::ArgumentCollector;
pub use result::{
    AcquisitionOutcome, AcquisitionResult, ArgumentValues, CancelReason, CollectionOutcome,
    CollectionResult,
};
pub use spec::{
    ArgumentInfo, ArgumentSnapshot, ArgumentSpec, EmptyHook, ParseHook, ValidateHook,
    DEFAULT_WAIT_SECS,
};
