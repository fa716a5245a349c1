use std::collections::VecDeque;

use crate::config::LogEntry;

pub const HISTORY_CAPACITY: usize = 2000;

/// Most recent console entries for late viewers. Oldest entries are dropped
/// once the capacity is reached.
#[derive(Debug)]
pub struct HistoryStore {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl HistoryStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(HISTORY_CAPACITY)),
            capacity,
        }
    }

    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogKind;

    fn entry(i: usize) -> LogEntry {
        LogEntry::now(format!("line {i}"), LogKind::Info)
    }

    #[test]
    fn keeps_insertion_order() {
        let mut store = HistoryStore::default();
        for i in 0..3 {
            store.append(entry(i));
        }
        let texts: Vec<_> = store.snapshot().into_iter().map(|e| e.text).collect();
        assert_eq!(texts, vec!["line 0", "line 1", "line 2"]);
    }

    #[test]
    fn entry_past_capacity_evicts_oldest() {
        let mut store = HistoryStore::default();
        for i in 0..=HISTORY_CAPACITY {
            store.append(entry(i));
        }

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), HISTORY_CAPACITY);
        assert_eq!(snapshot.first().unwrap().text, "line 1");
        assert_eq!(
            snapshot.last().unwrap().text,
            format!("line {HISTORY_CAPACITY}")
        );
    }
}
