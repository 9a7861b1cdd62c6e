use crate::model::{LogEntry, LogLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Level counts over one run. DEBUG is folded into `info_count`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
}

impl Statistics {
    pub fn from_entries(entries: &[LogEntry]) -> Self {
        let mut stats = Statistics::default();
        for entry in entries {
            stats.add_entry(entry);
        }
        stats
    }

    pub fn add_entry(&mut self, entry: &LogEntry) {
        match entry.level {
            LogLevel::Error | LogLevel::Critical | LogLevel::Fatal => self.error_count += 1,
            LogLevel::Warning => self.warning_count += 1,
            LogLevel::Info | LogLevel::Debug => self.info_count += 1,
        }
    }
}

/// Per-level histogram, in level order.
pub fn level_distribution(entries: &[LogEntry]) -> BTreeMap<LogLevel, usize> {
    let mut counts = BTreeMap::new();
    for entry in entries {
        *counts.entry(entry.level).or_insert(0) += 1;
    }
    counts
}
