//! Shared types for logsieve
//!
//! This crate contains the log entry model and the collaborator traits a log
//! store implements so the criteria engine can enumerate entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Log Types
// ============================================================================

/// Log severity level, ordered from least to most severe
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    #[default]
    Info = 2,
    Notice = 3,
    Warning = 4,
    Error = 5,
    Critical = 6,
}

impl Level {
    /// Every level in canonical severity order
    pub const ALL: [Level; 7] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Notice,
        Level::Warning,
        Level::Error,
        Level::Critical,
    ];

    /// Parse log level from common formats
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" | "trc" | "trce" => Some(Self::Trace),
            "debug" | "dbg" | "debg" => Some(Self::Debug),
            "info" | "inf" | "information" => Some(Self::Info),
            "notice" | "note" | "ntc" => Some(Self::Notice),
            "warn" | "warning" | "wrn" => Some(Self::Warning),
            "error" | "err" | "erro" => Some(Self::Error),
            "critical" | "crit" | "fatal" | "panic" | "ftl" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Lowercase name, as used in rules and config files
    pub fn name(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Notice => "notice",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    /// Short display string (3 chars)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "TRC",
            Self::Debug => "DBG",
            Self::Info => "INF",
            Self::Notice => "NTC",
            Self::Warning => "WRN",
            Self::Error => "ERR",
            Self::Critical => "CRT",
        }
    }

    /// Bit used by level bitmasks
    pub const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named field value attached to an entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric view of the value; text that parses as a number counts
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(s) if s.is_empty())
    }

    /// Convert a JSON value, keeping only scalars
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number),
            serde_json::Value::Bool(b) => Some(Self::Text(b.to_string())),
            serde_json::Value::Null => None,
            other => Some(Self::Text(other.to_string())),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// A single log entry
#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    /// Unique sequential ID, assigned by the store
    pub id: u64,

    /// Free-form category
    pub label: String,

    /// Severity
    pub level: Level,

    pub timestamp: DateTime<Utc>,

    pub message: String,

    /// Source file, if the producer reported one
    pub file: Option<String>,

    /// Source function, if the producer reported one
    pub function: Option<String>,

    /// Source line, if the producer reported one
    pub line: Option<u32>,

    /// Structured fields
    pub metadata: BTreeMap<String, FieldValue>,
}

impl LogEntry {
    /// Create a new log entry with minimal fields
    pub fn new(
        label: impl Into<String>,
        level: Level,
        timestamp: DateTime<Utc>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            label: label.into(),
            level,
            timestamp,
            message: message.into(),
            file: None,
            function: None,
            line: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_location(
        mut self,
        file: impl Into<String>,
        function: impl Into<String>,
        line: u32,
    ) -> Self {
        self.file = Some(file.into());
        self.function = Some(function.into());
        self.line = Some(line);
        self
    }
}

/// Shared handle to an ingested entry
pub type ArcLogEntry = Arc<LogEntry>;

// ============================================================================
// Store collaborator
// ============================================================================

/// Answers whether a timestamp belongs to the session currently being logged
pub trait SessionPredicate: Send + Sync {
    fn is_in_current_session(&self, timestamp: DateTime<Utc>) -> bool;
}

impl<F> SessionPredicate for F
where
    F: Fn(DateTime<Utc>) -> bool + Send + Sync,
{
    fn is_in_current_session(&self, timestamp: DateTime<Utc>) -> bool {
        self(timestamp)
    }
}

/// Restartable iteration over retained entries, oldest first
pub type LogEntries = Box<dyn Iterator<Item = ArcLogEntry> + Send>;

/// Source of entries and of the label universe
pub trait LogStore: SessionPredicate {
    /// Iterate retained history from the beginning
    fn entries(&self) -> LogEntries;

    /// Every label observed so far, sorted
    fn labels(&self) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Notice < Level::Warning);
        assert!(Level::Error < Level::Critical);
        let mut sorted = Level::ALL;
        sorted.sort();
        assert_eq!(sorted, Level::ALL);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse("WARN"), Some(Level::Warning));
        assert_eq!(Level::parse("fatal"), Some(Level::Critical));
        assert_eq!(Level::parse(" notice "), Some(Level::Notice));
        assert_eq!(Level::parse("verbose"), None);
    }

    #[test]
    fn test_level_bits_are_distinct() {
        let mask = Level::ALL.iter().fold(0u8, |acc, l| acc | l.bit());
        assert_eq!(mask, 0b0111_1111);
    }

    #[test]
    fn test_field_value_numeric_view() {
        assert_eq!(FieldValue::Number(2.5).as_number(), Some(2.5));
        assert_eq!(FieldValue::from("42").as_number(), Some(42.0));
        assert_eq!(FieldValue::from("abc").as_number(), None);
        assert!(FieldValue::from("").is_empty());
    }

    #[test]
    fn test_field_value_from_json() {
        let v = serde_json::json!(12);
        assert_eq!(FieldValue::from_json(&v), Some(FieldValue::Number(12.0)));
        assert_eq!(FieldValue::from_json(&serde_json::Value::Null), None);
        assert_eq!(
            FieldValue::from_json(&serde_json::json!(true)),
            Some(FieldValue::from("true"))
        );
    }
}
