//! # Dualstream Storage
//!
//! Persistence layer for the monitor.
//!
//! This crate provides:
//! - The [`StateStore`] trait through which the monitor loads and saves state
//! - A JSON file store that rewrites the whole document atomically
//! - An in-memory store for embedding and tests
//! - Baseline loading

#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]

pub mod baseline;
pub mod file;
pub mod memory;

use dualstream_core::{state::MonitorState, Result};

/// Trait for monitor state backends.
///
/// A store has a single owner; no locking is done across processes.
pub trait StateStore: Send + std::fmt::Debug {
    /// Load persisted state, `None` when nothing has been saved yet
    fn load(&self) -> Result<Option<MonitorState>>;

    /// Replace the persisted state
    fn save(&mut self, state: &MonitorState) -> Result<()>;

    /// Human-readable location, for logs
    fn location(&self) -> String;
}

/// Re-export commonly used types
pub mod prelude {
    pub use crate::baseline::{read_baseline, read_baseline_or_default};
    pub use crate::file::JsonFileStore;
    pub use crate::memory::MemoryStore;
    pub use crate::StateStore;
}
