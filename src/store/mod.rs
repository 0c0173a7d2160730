//! Record store gateway
//!
//! The narrow contract the core needs from persistence: a full ordered
//! scan, insert-if-absent keyed by `change_hash`, and one keyed offset
//! value for incremental ingestion.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::ChangeRecord;

/// Errors that can occur when talking to a record store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open store at {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },

    #[error("Store not found: {} (run `verba init` first)", .0.display())]
    NotInitialized(PathBuf),

    #[error("Malformed record {hash}: {reason}")]
    MalformedRow { hash: String, reason: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// Read/write access to change records
pub trait RecordStore {
    /// Every record, ascending by timestamp (ties by hash)
    ///
    /// Rows that cannot be decoded are logged and left out.
    fn scan_all(&self) -> Result<Vec<ChangeRecord>, StoreError>;

    /// Add `record` unless its hash is already stored
    ///
    /// Returns true if a row was added. Never overwrites; safe to repeat.
    fn insert_if_absent(&mut self, record: &ChangeRecord) -> Result<bool, StoreError>;
}

/// The consumed byte offset of the prompt log
pub trait OffsetStore {
    /// Stored offset, 0 if none was ever saved
    fn load_offset(&self) -> Result<u64, StoreError>;

    fn save_offset(&mut self, offset: u64) -> Result<(), StoreError>;
}
