//! Filter criteria for logsieve
//!
//! This crate holds the per-dimension criterion values, custom filter rules,
//! the aggregate that combines them, the evaluator that decides whether an
//! entry passes, and the controller that owns the live aggregate.

mod aggregate;
pub mod config;
mod controller;
mod dates;
mod error;
mod evaluator;
mod labels;
mod levels;
mod rule;

pub use aggregate::{CriteriaAggregate, Dimension, EffectiveCriteria, Toggled};
pub use config::{CriteriaConfig, load_criteria, parse_criteria};
pub use controller::{CriteriaChange, CriteriaController, CriteriaSnapshot};
pub use dates::{DateRange, RECENT_WINDOW_MINUTES};
pub use error::{ConfigWarning, CriteriaConfigError};
pub use evaluator::{Evaluator, passes};
pub use labels::LabelSet;
pub use levels::LevelSet;
pub use rule::{
    CompiledRule, CustomFilterRule, Resolved, RuleField, RuleId, RuleOperator, RuleOutcome,
    matches,
};

// Re-export types used in our public API
pub use logsieve_types::{Level, LogEntry, LogStore, SessionPredicate};
