/// Protocol log lines.
///
/// The engine emits a line for every protocol milestone through
/// [`ElectionObserver::on_log`](crate::observer::ElectionObserver::on_log)
/// and never reads them back. [`LogBuffer`] is the bounded, append-only
/// store a collaborator can keep them in.

use std::collections::VecDeque;

use crate::time::VirtualTime;

/// Entries kept by a [`LogBuffer`] unless configured otherwise.
pub const DEFAULT_LOG_RETENTION: usize = 100;

/// What kind of milestone a log line reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "lowercase"))]
pub enum LogCategory {
    Info,
    Election,
    Failure,
    Recovery,
    Leader,
}

impl std::fmt::Display for LogCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogCategory::Info => "info",
            LogCategory::Election => "election",
            LogCategory::Failure => "failure",
            LogCategory::Recovery => "recovery",
            LogCategory::Leader => "leader",
        };
        f.write_str(s)
    }
}

/// One log line.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct LogEntry {
    pub at: VirtualTime,
    pub category: LogCategory,
    pub text: String,
}

/// Append-only log that keeps only the trailing `capacity` entries.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    /// Total entries ever pushed, trimmed ones included.
    total: u64,
}

impl LogBuffer {
    /// A buffer keeping at most `capacity` entries (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        LogBuffer {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            total: 0,
        }
    }

    pub fn push(&mut self, at: VirtualTime, category: LogCategory, text: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            at,
            category,
            text: text.into(),
        });
        self.total += 1;
    }

    /// Retained entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn total_pushed(&self) -> u64 {
        self.total
    }

    /// Whether any retained entry contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|e| e.text.contains(needle))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(feature = "serialize")]
    pub fn to_json(&self) -> crate::error::BullyResult<String> {
        serde_json::to_string(&self.entries)
            .map_err(|e| crate::error::BullyError::Serialization(e.to_string()))
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_RETENTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_window() {
        let mut log = LogBuffer::with_capacity(3);
        for i in 0..5 {
            log.push(VirtualTime::from_millis(i), LogCategory::Info, format!("line {}", i));
        }
        let texts: Vec<_> = log.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["line 2", "line 3", "line 4"]);
        assert_eq!(log.total_pushed(), 5);
        assert!(!log.contains("line 0"));
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut log = LogBuffer::with_capacity(0);
        log.push(VirtualTime::ZERO, LogCategory::Leader, "a");
        log.push(VirtualTime::ZERO, LogCategory::Leader, "b");
        assert_eq!(log.len(), 1);
        assert!(log.contains("b"));
    }

    #[test]
    fn test_category_display() {
        assert_eq!(LogCategory::Recovery.to_string(), "recovery");
        assert_eq!(LogCategory::Failure.to_string(), "failure");
    }
}
