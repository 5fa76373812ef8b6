//! Processed-ID ledger.
//!
//! The ledger is the durable record of which `Message-ID`s have already
//! become posts. It is read once at the start of a cycle and written once at
//! the end, keeping only the newest [`LEDGER_CAPACITY`] entries.

mod json_file;

pub use json_file::JsonFileLedger;

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::{Error, Result};

/// Number of most recent Message-IDs retained.
pub const LEDGER_CAPACITY: usize = 500;

/// Persistence for the ordered list of processed Message-IDs.
///
/// Last write wins; no transactional guarantee is expected.
pub trait LedgerStore {
    /// Loads the stored IDs, oldest first. A store never written is empty.
    fn load(&self) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Replaces the stored IDs.
    fn save(&self, ids: &[String]) -> impl Future<Output = Result<()>> + Send;
}

/// In-memory view of the ledger during a cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedIds {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl ProcessedIds {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `message_id` was already ingested.
    #[must_use]
    pub fn contains(&self, message_id: &str) -> bool {
        self.seen.contains(message_id)
    }

    /// Records `message_id` as the newest entry.
    ///
    /// Empty IDs and IDs already present are ignored.
    pub fn insert(&mut self, message_id: impl Into<String>) {
        let message_id = message_id.into();
        if message_id.is_empty() || self.seen.contains(&message_id) {
            return;
        }
        self.seen.insert(message_id.clone());
        self.order.push(message_id);
    }

    /// Drops the oldest entries until at most `capacity` remain.
    pub fn truncate_oldest(&mut self, capacity: usize) {
        if self.order.len() <= capacity {
            return;
        }
        let excess = self.order.len() - capacity;
        for evicted in self.order.drain(..excess) {
            self.seen.remove(&evicted);
        }
    }

    /// Number of IDs held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if no IDs are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// IDs oldest first.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.order
    }
}

impl FromIterator<String> for ProcessedIds {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut ids = Self::new();
        for id in iter {
            ids.insert(id);
        }
        ids
    }
}

/// Ledger held in memory, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    ids: Arc<Mutex<Vec<String>>>,
}

impl MemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger pre-populated with `ids`, oldest first.
    #[must_use]
    pub fn with_ids(ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            ids: Arc::new(Mutex::new(ids.into_iter().collect())),
        }
    }

    /// Returns a copy of the stored IDs.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.ids.lock().map(|ids| ids.clone()).unwrap_or_default()
    }
}

impl LedgerStore for MemoryLedger {
    async fn load(&self) -> Result<Vec<String>> {
        self.ids
            .lock()
            .map(|ids| ids.clone())
            .map_err(|_| Error::Ledger("memory ledger lock poisoned".to_string()))
    }

    async fn save(&self, ids: &[String]) -> Result<()> {
        let mut stored = self
            .ids
            .lock()
            .map_err(|_| Error::Ledger("memory ledger lock poisoned".to_string()))?;
        *stored = ids.to_vec();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let mut ids = ProcessedIds::new();
        ids.insert("<a@x>");
        ids.insert("<b@x>");
        ids.insert("<a@x>");
        ids.insert("");
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("<a@x>"));
        assert!(!ids.contains("<c@x>"));
        assert_eq!(ids.as_slice(), ["<a@x>", "<b@x>"]);
    }

    #[test]
    fn test_truncate_keeps_newest() {
        let mut ids: ProcessedIds = (0..510).map(|i| format!("<{i}@x>")).collect();
        ids.truncate_oldest(LEDGER_CAPACITY);
        assert_eq!(ids.len(), LEDGER_CAPACITY);
        assert_eq!(ids.as_slice()[0], "<10@x>");
        assert_eq!(ids.as_slice()[499], "<509@x>");
        assert!(!ids.contains("<9@x>"));
        assert!(ids.contains("<10@x>"));
    }

    #[test]
    fn test_truncate_under_capacity_is_noop() {
        let mut ids: ProcessedIds = ["<a@x>".to_string()].into_iter().collect();
        ids.truncate_oldest(LEDGER_CAPACITY);
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_ledger_round_trip() {
        let ledger = MemoryLedger::new();
        assert!(ledger.load().await.unwrap().is_empty());
        ledger
            .save(&["<a@x>".to_string(), "<b@x>".to_string()])
            .await
            .unwrap();
        assert_eq!(ledger.load().await.unwrap(), ["<a@x>", "<b@x>"]);
        assert_eq!(ledger.clone().snapshot().len(), 2);
    }

    proptest::proptest! {
        #[test]
        fn prop_truncation_keeps_most_recent(count in 0usize..1200) {
            let mut ids: ProcessedIds = (0..count).map(|i| format!("<{i}@x>")).collect();
            ids.truncate_oldest(LEDGER_CAPACITY);
            let expected: Vec<String> = (count.saturating_sub(LEDGER_CAPACITY)..count)
                .map(|i| format!("<{i}@x>"))
                .collect();
            proptest::prop_assert_eq!(ids.as_slice(), expected.as_slice());
        }
    }
}
