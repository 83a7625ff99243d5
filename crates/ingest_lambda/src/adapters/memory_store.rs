use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use ingest_core::record::ItemRecord;
use ingest_core::storage_keys::RecordKey;

use crate::adapters::record_store::{PutError, RecordStore};

/// Process-local store with the same first-write-wins semantics as the table.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<BTreeMap<RecordKey, ItemRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &RecordKey) -> Option<ItemRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn keys(&self) -> Vec<RecordKey> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn records(&self) -> Vec<ItemRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

impl RecordStore for MemoryRecordStore {
    fn put_if_absent(&self, record: &ItemRecord) -> Result<(), PutError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| PutError::Store("memory record store lock poisoned".to_string()))?;
        if records.contains_key(&record.key) {
            return Err(PutError::ConditionFailed);
        }
        records.insert(record.key.clone(), record.clone());
        Ok(())
    }
}
