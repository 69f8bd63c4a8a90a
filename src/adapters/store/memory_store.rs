use std::sync::{Mutex, PoisonError};

use crate::core::errors::Result;
use crate::core::models::change_record::ChangeRecord;
use crate::core::traits::store::ChangeStore;

/// Append-only change store held in memory.
///
/// Useful for embedding Vestige in tests or in hosts that ship
/// records elsewhere and only need a process-local buffer.
#[derive(Default)]
pub struct MemoryChangeStore {
    records: Mutex<Vec<ChangeRecord>>,
}

impl MemoryChangeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records stored so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of all stored records, oldest first.
    pub fn records(&self) -> Vec<ChangeRecord> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ChangeRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChangeStore for MemoryChangeStore {
    fn create(&self, record: ChangeRecord) -> Result<ChangeRecord> {
        self.lock().push(record.clone());
        Ok(record)
    }

    fn query_by_target(&self, identifier: &str) -> Result<Vec<ChangeRecord>> {
        Ok(self
            .lock()
            .iter()
            .filter(|record| record.identifier == identifier)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::change_record::{Action, ChangeRecord, TargetDescriptor};

    fn sample(identifier: &str) -> ChangeRecord {
        let target = TargetDescriptor::new("article", identifier, "articles", "Article");
        ChangeRecord::new(&target, Action::Create, None)
    }

    #[test]
    fn create_appends_in_order() {
        let store = MemoryChangeStore::new();
        store.create(sample("1")).unwrap();
        store.create(sample("2")).unwrap();

        let records = store.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].identifier, "1");
        assert_eq!(records[1].identifier, "2");
    }

    #[test]
    fn query_filters_by_identifier() {
        let store = MemoryChangeStore::new();
        store.create(sample("1")).unwrap();
        store.create(sample("2")).unwrap();
        store.create(sample("1")).unwrap();

        let results = store.query_by_target("1").unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.identifier == "1"));
    }

    #[test]
    fn query_unknown_identifier_is_empty() {
        let store = MemoryChangeStore::new();
        store.create(sample("1")).unwrap();

        assert!(store.query_by_target("missing").unwrap().is_empty());
    }
}
