//! Log handling for logsieve
//!
//! This crate provides log buffering, line parsing, and cancellable batch
//! filtering against the live criteria.

mod buffer;
mod parser;
mod runner;

pub use buffer::{LevelCounts, LogBuffer};
pub use parser::{DEFAULT_LABEL, LogParser};
pub use runner::{CHUNK_SIZE, FilterRunner, FilteredSet, run_pass};

// Re-export types used in our public API
pub use logsieve_types::{ArcLogEntry, Level, LogEntry};
