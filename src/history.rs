//! Bounded ledger of executed requests, used for replay.

use crate::domain::{HistoryEntry, RequestSpec};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Maximum number of history entries to retain.
const MAX_HISTORY_ENTRIES: usize = 50;

/// Append-only bounded log of executed requests, newest first. A single lock
/// guards append + eviction so concurrent executions cannot interleave them.
#[derive(Debug, Default)]
pub struct HistoryLedger {
    entries: Mutex<VecDeque<HistoryEntry>>,
    next_id: AtomicU64,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished execution. The snapshot is the caller's original
    /// (pre-script) spec; `response_status` is absent when no HTTP response
    /// was obtained.
    pub fn record(&self, snapshot: &RequestSpec, response_status: Option<u16>) -> HistoryEntry {
        let entry = HistoryEntry {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            timestamp: now_ms(),
            request_snapshot: snapshot.clone(),
            response_status,
        };

        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if entries.len() >= MAX_HISTORY_ENTRIES {
            entries.pop_back();
        }
        entries.push_front(entry.clone());
        entry
    }

    /// Snapshot of all entries, most recent first.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        let entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        match self.entries.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.clear();
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BodyType, HttpMethod};

    fn spec(url: &str) -> RequestSpec {
        RequestSpec {
            id: "r1".into(),
            name: "demo".into(),
            method: HttpMethod::Get,
            url: url.to_string(),
            headers: vec![],
            query_params: vec![],
            body_type: BodyType::None,
            body: String::new(),
            pre_script: String::new(),
            post_script: String::new(),
        }
    }

    #[test]
    fn record_and_retrieve_newest_first() {
        let ledger = HistoryLedger::new();
        ledger.record(&spec("https://a.com"), Some(200));
        ledger.record(&spec("https://b.com"), None);

        let entries = ledger.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].request_snapshot.url, "https://b.com");
        assert_eq!(entries[0].response_status, None);
        assert_eq!(entries[1].request_snapshot.url, "https://a.com");
        assert_eq!(entries[1].response_status, Some(200));
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let ledger = HistoryLedger::new();
        for i in 0..60 {
            ledger.record(&spec(&format!("https://example.com/{i}")), Some(200));
        }

        let entries = ledger.entries();
        assert_eq!(entries.len(), MAX_HISTORY_ENTRIES);
        // Newest first; the oldest 10 are gone.
        assert_eq!(entries[0].request_snapshot.url, "https://example.com/59");
        assert_eq!(entries[49].request_snapshot.url, "https://example.com/10");
    }

    #[test]
    fn ids_are_monotonic() {
        let ledger = HistoryLedger::new();
        let first = ledger.record(&spec("https://a.com"), Some(200));
        let second = ledger.record(&spec("https://a.com"), Some(200));
        assert!(second.id > first.id);
    }

    #[test]
    fn concurrent_records_stay_bounded() {
        let ledger = std::sync::Arc::new(HistoryLedger::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let ledger = ledger.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..30 {
                    ledger.record(&spec(&format!("https://example.com/{i}")), Some(200));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(ledger.len(), MAX_HISTORY_ENTRIES);
    }

    #[test]
    fn clear_empties_entries() {
        let ledger = HistoryLedger::new();
        ledger.record(&spec("https://a.com"), Some(200));
        ledger.clear();
        assert!(ledger.is_empty());
    }
}
