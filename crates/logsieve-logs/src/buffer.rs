use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use logsieve_types::{ArcLogEntry, Level, LogEntries, LogEntry, LogStore, SessionPredicate};

/// Thread-safe ring buffer for log entries
#[derive(Clone)]
pub struct LogBuffer {
    /// Internal storage
    entries: Arc<RwLock<VecDeque<ArcLogEntry>>>,

    /// Every label seen since the last clear
    labels: Arc<RwLock<BTreeSet<String>>>,

    /// Start of the current session (None = everything is current)
    session_start: Arc<RwLock<Option<DateTime<Utc>>>>,

    /// Maximum capacity
    capacity: usize,

    /// Next entry ID
    next_id: Arc<AtomicU64>,
}

impl LogBuffer {
    /// Create a new log buffer with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            labels: Arc::new(RwLock::new(BTreeSet::new())),
            session_start: Arc::new(RwLock::new(None)),
            capacity,
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Push a new entry, evicting oldest if at capacity
    pub fn push(&self, mut entry: LogEntry) -> ArcLogEntry {
        entry.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if !self.labels.read().contains(&entry.label) {
            self.labels.write().insert(entry.label.clone());
        }

        let entry = Arc::new(entry);
        let mut entries = self.entries.write();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(Arc::clone(&entry));
        entry
    }

    /// Mark the start of a new logging session
    pub fn begin_session(&self, start: DateTime<Utc>) {
        *self.session_start.write() = Some(start);
    }

    pub fn session_start(&self) -> Option<DateTime<Utc>> {
        *self.session_start.read()
    }

    /// Get all entries
    pub fn all(&self) -> Vec<ArcLogEntry> {
        self.entries.read().iter().cloned().collect()
    }

    /// Get entry count per log level
    pub fn level_counts(&self) -> LevelCounts {
        let entries = self.entries.read();
        let mut counts = LevelCounts::default();
        for entry in entries.iter() {
            counts.counts[entry.level as usize] += 1;
        }
        counts
    }

    /// Total entry count
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Clear all entries
    pub fn clear(&self) {
        self.entries.write().clear();
        self.labels.write().clear();
        self.next_id.store(0, Ordering::SeqCst);
    }
}

impl SessionPredicate for LogBuffer {
    fn is_in_current_session(&self, timestamp: DateTime<Utc>) -> bool {
        self.session_start().is_none_or(|start| timestamp >= start)
    }
}

impl LogStore for LogBuffer {
    /// Iterates a copy of the retained entries taken at call time
    fn entries(&self) -> LogEntries {
        Box::new(self.all().into_iter())
    }

    fn labels(&self) -> Vec<String> {
        self.labels.read().iter().cloned().collect()
    }
}

/// Counts per log level
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LevelCounts {
    counts: [usize; Level::ALL.len()],
}

impl LevelCounts {
    pub fn get(&self, level: Level) -> usize {
        self.counts[level as usize]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
    }

    fn entry(label: &str, level: Level, minute: u32) -> LogEntry {
        LogEntry::new(label, level, at(minute), "msg")
    }

    #[test]
    fn test_push_assigns_ids_and_evicts() {
        let buffer = LogBuffer::new(2);
        buffer.push(entry("a", Level::Info, 0));
        buffer.push(entry("b", Level::Info, 1));
        let third = buffer.push(entry("c", Level::Info, 2));
        assert_eq!(third.id, 2);
        assert_eq!(buffer.len(), 2);
        let ids: Vec<_> = buffer.all().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_labels_are_sorted_and_unique() {
        let buffer = LogBuffer::new(10);
        buffer.push(entry("ui", Level::Info, 0));
        buffer.push(entry("db", Level::Info, 1));
        buffer.push(entry("ui", Level::Error, 2));
        assert_eq!(buffer.labels(), vec!["db".to_string(), "ui".to_string()]);
        buffer.clear();
        assert!(buffer.labels().is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_session_predicate() {
        let buffer = LogBuffer::new(10);
        assert!(buffer.is_in_current_session(at(0)));
        buffer.begin_session(at(30));
        assert!(buffer.is_in_current_session(at(30)));
        assert!(buffer.is_in_current_session(at(30) + Duration::seconds(1)));
        assert!(!buffer.is_in_current_session(at(29)));
    }

    #[test]
    fn test_entries_are_restartable() {
        let buffer = LogBuffer::new(10);
        for i in 0..5 {
            buffer.push(entry("a", Level::Debug, i));
        }
        assert_eq!(buffer.entries().count(), 5);
        assert_eq!(buffer.entries().count(), 5);
    }

    #[test]
    fn test_level_counts() {
        let buffer = LogBuffer::new(10);
        buffer.push(entry("a", Level::Error, 0));
        buffer.push(entry("a", Level::Error, 1));
        buffer.push(entry("a", Level::Notice, 2));
        let counts = buffer.level_counts();
        assert_eq!(counts.get(Level::Error), 2);
        assert_eq!(counts.get(Level::Notice), 1);
        assert_eq!(counts.get(Level::Trace), 0);
        assert_eq!(counts.total(), 3);
    }
}
