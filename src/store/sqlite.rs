//! SQLite-backed record store
//!
//! Schema:
//! - code_changes: (change_hash TEXT PRIMARY KEY, filename, file_change,
//!   timestamp, prompt, is_committed, commit_hash), indexed on filename
//!   and is_committed
//! - processing_state: (key TEXT PRIMARY KEY, value TEXT)
//!
//! The store file is meant to be committed to git, so the default rollback
//! journal is kept (no WAL side files).

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Params, Row, params};

use super::{OffsetStore, RecordStore, StoreError};
use crate::constants::OFFSET_KEY;
use crate::model::{ChangeRecord, parse_timestamp, sort_for_display};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS code_changes (
        change_hash TEXT PRIMARY KEY,
        filename TEXT NOT NULL,
        file_change TEXT NOT NULL,
        timestamp TIMESTAMP NOT NULL,
        prompt TEXT NOT NULL,
        is_committed BOOLEAN DEFAULT FALSE,
        commit_hash TEXT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_filename ON code_changes(filename);
    CREATE INDEX IF NOT EXISTS idx_committed ON code_changes(is_committed);
    CREATE TABLE IF NOT EXISTS processing_state (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

const SELECT_RECORDS: &str = "
    SELECT change_hash, filename, file_change, timestamp, prompt, is_committed, commit_hash
    FROM code_changes";

const ORDER_FOR_DISPLAY: &str = "ORDER BY timestamp ASC, change_hash ASC";

const INSERT_OR_IGNORE: &str = "
    INSERT OR IGNORE INTO code_changes
    (change_hash, filename, file_change, timestamp, prompt, is_committed, commit_hash)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

/// A row as stored, before validation
struct RawRow {
    change_hash: String,
    filename: String,
    file_change: String,
    timestamp: String,
    prompt: String,
    is_committed: bool,
    commit_hash: Option<String>,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            change_hash: row.get(0)?,
            filename: row.get(1)?,
            file_change: row.get(2)?,
            timestamp: row.get(3)?,
            prompt: row.get(4)?,
            is_committed: row.get::<_, Option<bool>>(5)?.unwrap_or(false),
            commit_hash: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<ChangeRecord, StoreError> {
        if self.change_hash.is_empty() || self.filename.is_empty() || self.prompt.is_empty() {
            return Err(StoreError::MalformedRow {
                hash: self.change_hash,
                reason: "empty required field".to_string(),
            });
        }
        // the hash is kept as stored, so the record survives a merge
        let timestamp = parse_timestamp(&self.timestamp).unwrap_or_else(|| {
            tracing::warn!(
                hash = %self.change_hash,
                timestamp = %self.timestamp,
                "Unparsable stored timestamp, using current time"
            );
            Utc::now()
        });

        Ok(ChangeRecord {
            change_hash: self.change_hash,
            filename: self.filename,
            file_change: self.file_change,
            timestamp,
            prompt: self.prompt,
            is_committed: self.is_committed,
            commit_hash: self.commit_hash,
        })
    }
}

/// Record store in a single SQLite file
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    /// Create (or open) a store, creating the parent directory and schema
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        Self::open_with_schema(path)
    }

    /// Open an existing store
    ///
    /// Fails with [`StoreError::NotInitialized`] if the file is missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(StoreError::NotInitialized(path));
        }

        Self::open_with_schema(path)
    }

    /// Open a store read-only, as a merge input
    ///
    /// A missing or zero-length file is `Ok(None)`: it holds no records.
    pub fn open_source(path: impl AsRef<Path>) -> Result<Option<Self>, StoreError> {
        let path = path.as_ref().to_path_buf();

        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::IoError(e)),
        };
        if metadata.len() == 0 {
            return Ok(None);
        }

        let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|source| StoreError::Open {
                path: path.clone(),
                source,
            })?;

        Ok(Some(Self { conn, path }))
    }

    fn open_with_schema(path: PathBuf) -> Result<Self, StoreError> {
        let conn = Connection::open(&path)
            .and_then(|conn| conn.execute_batch(SCHEMA).map(|_| conn))
            .map_err(|source| StoreError::Open {
                path: path.clone(),
                source,
            })?;

        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored records
    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM code_changes", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Records touching `filename`, ascending by timestamp
    pub fn scan_by_filename(&self, filename: &str) -> Result<Vec<ChangeRecord>, StoreError> {
        let sql = format!("{SELECT_RECORDS} WHERE filename = ?1 {ORDER_FOR_DISPLAY}");
        self.query_records(&sql, [filename])
    }

    /// Records not yet marked committed, ascending by timestamp
    pub fn scan_uncommitted(&self) -> Result<Vec<ChangeRecord>, StoreError> {
        let sql = format!("{SELECT_RECORDS} WHERE is_committed = 0 {ORDER_FOR_DISPLAY}");
        self.query_records(&sql, [])
    }

    /// Run a record query, skipping rows that fail to decode
    ///
    /// Rows from other producers may store timestamps in another text
    /// form, so the decoded records are sorted by time again.
    fn query_records<P: Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<ChangeRecord>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, RawRow::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            match row.map_err(StoreError::from).and_then(RawRow::into_record) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(
                        store = %self.path.display(),
                        error = %e,
                        "Skipping unreadable record"
                    );
                }
            }
        }
        sort_for_display(&mut records);
        Ok(records)
    }
}

impl RecordStore for SqliteStore {
    fn scan_all(&self) -> Result<Vec<ChangeRecord>, StoreError> {
        let sql = format!("{SELECT_RECORDS} {ORDER_FOR_DISPLAY}");
        self.query_records(&sql, [])
    }

    fn insert_if_absent(&mut self, record: &ChangeRecord) -> Result<bool, StoreError> {
        let changed = self.conn.execute(
            INSERT_OR_IGNORE,
            params![
                record.change_hash,
                record.filename,
                record.file_change,
                record.timestamp_text(),
                record.prompt,
                record.is_committed,
                record.commit_hash,
            ],
        )?;
        Ok(changed > 0)
    }
}

impl OffsetStore for SqliteStore {
    fn load_offset(&self) -> Result<u64, StoreError> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM processing_state WHERE key = ?1",
                [OFFSET_KEY],
                |row| row.get(0),
            )
            .optional()?;

        Ok(match value {
            Some(text) => text.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %text, "Stored log offset is not a number, starting from 0");
                0
            }),
            None => 0,
        })
    }

    fn save_offset(&mut self, offset: u64) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO processing_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![OFFSET_KEY, offset.to_string()],
        )?;
        Ok(())
    }
}
