//! In-memory settings storage for the command framework.
//!
//! Values are JSON, scoped globally or per guild. Nothing is persisted.

mod store;

pub use store::MemorySettings;
