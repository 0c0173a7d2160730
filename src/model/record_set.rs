//! Hash-keyed record set
//!
//! A grow-only set of [`ChangeRecord`]s keyed by `change_hash`. Insertion
//! never replaces an existing entry, so unions built from it are
//! commutative, associative and idempotent independent of any store.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use super::ChangeRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSet {
    records: BTreeMap<String, ChangeRecord>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless a record with the same hash is present
    ///
    /// Returns true if the record was added. An existing entry is left
    /// untouched, even if other fields differ.
    pub fn insert_if_absent(&mut self, record: ChangeRecord) -> bool {
        match self.records.entry(record.change_hash.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Insert every record, returning how many were new
    pub fn extend_absent<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = ChangeRecord>,
    {
        records
            .into_iter()
            .map(|record| self.insert_if_absent(record))
            .filter(|&added| added)
            .count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, change_hash: &str) -> bool {
        self.records.contains_key(change_hash)
    }

    pub fn get(&self, change_hash: &str) -> Option<&ChangeRecord> {
        self.records.get(change_hash)
    }

    /// Hashes in ascending order
    pub fn hashes(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Records in hash order
    pub fn iter(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records.values()
    }

    /// Records ordered by timestamp, ties broken by hash
    pub fn to_sorted_vec(&self) -> Vec<ChangeRecord> {
        let mut records: Vec<ChangeRecord> = self.records.values().cloned().collect();
        sort_for_display(&mut records);
        records
    }
}

/// Read-back order: ascending timestamp, then hash
pub fn sort_for_display(records: &mut [ChangeRecord]) {
    records.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.change_hash.cmp(&b.change_hash))
    });
}

impl FromIterator<ChangeRecord> for RecordSet {
    fn from_iter<I: IntoIterator<Item = ChangeRecord>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend_absent(iter);
        set
    }
}

impl IntoIterator for RecordSet {
    type Item = ChangeRecord;
    type IntoIter = std::collections::btree_map::IntoValues<String, ChangeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_values()
    }
}
