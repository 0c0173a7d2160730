//! In-memory record store

use super::{OffsetStore, RecordStore, StoreError};
use crate::model::{ChangeRecord, RecordSet};

/// A store held entirely in a [`RecordSet`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    pub records: RecordSet,
    pub offset: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl From<RecordSet> for MemoryStore {
    fn from(records: RecordSet) -> Self {
        Self { records, offset: 0 }
    }
}

impl RecordStore for MemoryStore {
    fn scan_all(&self) -> Result<Vec<ChangeRecord>, StoreError> {
        Ok(self.records.to_sorted_vec())
    }

    fn insert_if_absent(&mut self, record: &ChangeRecord) -> Result<bool, StoreError> {
        Ok(self.records.insert_if_absent(record.clone()))
    }
}

impl OffsetStore for MemoryStore {
    fn load_offset(&self) -> Result<u64, StoreError> {
        Ok(self.offset)
    }

    fn save_offset(&mut self, offset: u64) -> Result<(), StoreError> {
        self.offset = offset;
        Ok(())
    }
}
