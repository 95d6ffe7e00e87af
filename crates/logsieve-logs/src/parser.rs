use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use logsieve_types::{FieldValue, Level, LogEntry};

/// Label given to lines that name none
pub const DEFAULT_LABEL: &str = "default";

const LEVEL_FIELDS: [&str; 6] = ["level", "lvl", "severity", "log.level", "loglevel", "log_level"];
const LABEL_FIELDS: [&str; 5] = ["label", "category", "logger", "target", "component"];
const TIME_FIELDS: [&str; 4] = ["timestamp", "time", "ts", "@timestamp"];
const MESSAGE_FIELDS: [&str; 5] = ["message", "msg", "log", "text", "body"];

/// Log parser for extracting structure from raw log lines
pub struct LogParser;

impl LogParser {
    /// Parse a raw log line into a LogEntry
    ///
    /// Lines without a timestamp are stamped with `received_at`. Blank lines
    /// yield nothing.
    pub fn parse(raw: &str, received_at: DateTime<Utc>) -> Option<LogEntry> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Some(entry) = Self::try_parse_json(trimmed, received_at) {
            return Some(entry);
        }

        let (timestamp, content) = Self::extract_timestamp(trimmed);
        let level = Self::extract_level_from_text(content).unwrap_or_default();
        let (label, message) = Self::extract_label(content);
        Some(LogEntry::new(
            label,
            level,
            timestamp.unwrap_or(received_at),
            message,
        ))
    }

    /// Extract an RFC 3339 timestamp from the beginning of a line
    fn extract_timestamp(raw: &str) -> (Option<DateTime<Utc>>, &str) {
        let Some((head, rest)) = raw.split_once(char::is_whitespace) else {
            return (None, raw);
        };
        match DateTime::parse_from_rfc3339(head) {
            Ok(ts) => (Some(ts.with_timezone(&Utc)), rest.trim_start()),
            Err(_) => (None, raw),
        }
    }

    /// Split `[LEVEL] label: message` into label and message
    fn extract_label(content: &str) -> (&str, &str) {
        let content = match content.strip_prefix('[') {
            Some(rest) => rest.split_once(']').map_or(content, |(_, tail)| tail.trim_start()),
            None => content,
        };
        match content.split_once(": ") {
            Some((label, message))
                if !label.is_empty() && !label.contains(char::is_whitespace) =>
            {
                (label, message)
            }
            _ => (DEFAULT_LABEL, content),
        }
    }

    /// Try to parse content as a JSON object
    fn try_parse_json(content: &str, received_at: DateTime<Utc>) -> Option<LogEntry> {
        if !content.starts_with('{') {
            return None;
        }
        let value: Value = serde_json::from_str(content).ok()?;
        let mut obj = value.as_object()?.clone();

        let level = Self::take_first(&mut obj, &LEVEL_FIELDS)
            .and_then(|v| Self::level_from_json(&v))
            .unwrap_or_default();
        let label = Self::take_first(&mut obj, &LABEL_FIELDS)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_LABEL.to_string());
        let timestamp = Self::take_first(&mut obj, &TIME_FIELDS)
            .and_then(|v| v.as_str().and_then(|s| DateTime::parse_from_rfc3339(s).ok()))
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or(received_at);
        let message = Self::take_first(&mut obj, &MESSAGE_FIELDS)
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .unwrap_or_default();

        let mut entry = LogEntry::new(label, level, timestamp, message);
        entry.file = obj
            .remove("file")
            .and_then(|v| v.as_str().map(str::to_string));
        entry.function = obj
            .remove("function")
            .and_then(|v| v.as_str().map(str::to_string));
        entry.line = obj
            .remove("line")
            .and_then(|v| v.as_u64())
            .and_then(|n| u32::try_from(n).ok());

        for (key, value) in &obj {
            if let Some(field) = FieldValue::from_json(value) {
                entry.metadata.insert(key.clone(), field);
            }
        }
        Some(entry)
    }

    fn take_first(obj: &mut Map<String, Value>, keys: &[&str]) -> Option<Value> {
        keys.iter().find_map(|key| obj.remove(*key))
    }

    /// Extract log level from a JSON value
    fn level_from_json(value: &Value) -> Option<Level> {
        match value {
            Value::String(s) => Level::parse(s),
            // Some loggers use numeric levels
            Value::Number(n) => n.as_u64().map(|num| match num {
                0..=10 => Level::Trace,
                11..=20 => Level::Debug,
                21..=30 => Level::Info,
                31..=35 => Level::Notice,
                36..=40 => Level::Warning,
                41..=50 => Level::Error,
                _ => Level::Critical,
            }),
            _ => None,
        }
    }

    /// Extract log level from plain text patterns
    fn extract_level_from_text(content: &str) -> Option<Level> {
        let upper = content.to_uppercase();

        // Check for bracketed patterns first [ERROR], [WARN], etc.
        let bracket_patterns = [
            ("[CRITICAL]", Level::Critical),
            ("[FATAL]", Level::Critical),
            ("[ERROR]", Level::Error),
            ("[ERR]", Level::Error),
            ("[WARNING]", Level::Warning),
            ("[WARN]", Level::Warning),
            ("[NOTICE]", Level::Notice),
            ("[INFO]", Level::Info),
            ("[DEBUG]", Level::Debug),
            ("[TRACE]", Level::Trace),
        ];
        for (pattern, level) in bracket_patterns {
            if upper.contains(pattern) {
                return Some(level);
            }
        }

        // Check for level at start of line
        let start_patterns = [
            ("CRITICAL", Level::Critical),
            ("FATAL", Level::Critical),
            ("ERROR", Level::Error),
            ("WARNING", Level::Warning),
            ("WARN", Level::Warning),
            ("NOTICE", Level::Notice),
            ("INFO", Level::Info),
            ("DEBUG", Level::Debug),
            ("TRACE", Level::Trace),
        ];
        let trimmed_upper = upper.trim_start();
        start_patterns
            .into_iter()
            .find(|(pattern, _)| trimmed_upper.starts_with(pattern))
            .map(|(_, level)| level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn received() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_json_log() {
        let line = r#"{"level":"error","label":"net","msg":"connection timeout","time":"2024-01-15T10:30:00Z","duration_ms":850,"user":"kean","line":12}"#;
        let entry = LogParser::parse(line, received()).unwrap();
        assert_eq!(entry.level, Level::Error);
        assert_eq!(entry.label, "net");
        assert_eq!(entry.message, "connection timeout");
        assert_eq!(
            entry.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
        );
        assert_eq!(entry.line, Some(12));
        assert_eq!(
            entry.metadata.get("duration_ms"),
            Some(&FieldValue::Number(850.0))
        );
        assert_eq!(entry.metadata.get("user"), Some(&FieldValue::from("kean")));
        assert!(!entry.metadata.contains_key("msg"));
    }

    #[test]
    fn test_parse_json_numeric_level() {
        let line = r#"{"level":50,"msg":"boom"}"#;
        let entry = LogParser::parse(line, received()).unwrap();
        assert_eq!(entry.level, Level::Error);
        assert_eq!(entry.label, DEFAULT_LABEL);
        assert_eq!(entry.timestamp, received());
    }

    #[test]
    fn test_parse_text_line() {
        let line = "2024-01-15T10:30:00.123Z [WARNING] db: slow query";
        let entry = LogParser::parse(line, received()).unwrap();
        assert_eq!(entry.level, Level::Warning);
        assert_eq!(entry.label, "db");
        assert_eq!(entry.message, "slow query");
        assert!(entry.timestamp > received());
    }

    #[test]
    fn test_parse_text_without_label() {
        let entry = LogParser::parse("NOTICE disk almost full", received()).unwrap();
        assert_eq!(entry.level, Level::Notice);
        assert_eq!(entry.label, DEFAULT_LABEL);
        assert_eq!(entry.message, "NOTICE disk almost full");
    }

    #[test]
    fn test_blank_line_is_skipped() {
        assert!(LogParser::parse("   ", received()).is_none());
    }

    #[test]
    fn test_parse_multibyte_utf8_no_panic() {
        let line = "─────────────────────────────────────────";
        let entry = LogParser::parse(line, received()).unwrap();
        assert_eq!(entry.timestamp, received());
        assert_eq!(entry.level, Level::Info);
    }
}
