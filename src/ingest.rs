//! Prompt log ingestion
//!
//! One [`Extractor`] behind two consumption policies:
//! - full rescan: read the whole log, store its records, then truncate it
//! - incremental: read only the bytes past a stored offset, then advance it
//!
//! The offset is an explicit value: read before a run, written after.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::extract::{ExtractStats, Extractor};
use crate::store::{OffsetStore, RecordStore, StoreError};

/// Errors that can occur while ingesting the prompt log
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to read prompt log {}: {source}", .path.display())]
    ReadLog { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How the log is consumed on each run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsumptionPolicy {
    /// Whole log every run, cleared afterwards
    #[default]
    FullRescan,

    /// Only the suffix beyond the stored offset
    Incremental,
}

/// Outcome of one ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub extract: ExtractStats,

    /// Rows newly added to the store
    pub inserted: usize,

    /// Records the store already held
    pub duplicates: usize,

    /// Records skipped after an insert error
    pub failed: usize,

    /// Bytes of log text read this run
    pub bytes_read: u64,

    /// Offset to persist for the next incremental run
    pub next_offset: u64,

    /// Whether the log was truncated after a full rescan
    pub cleared: bool,
}

impl IngestReport {
    /// Records the extractor produced
    pub fn changes(&self) -> usize {
        self.extract.emitted
    }
}

/// Extract records from `text` and insert them into `store`
///
/// Insert failures are logged and skipped.
pub fn ingest_text<S>(text: &str, store: &mut S) -> IngestReport
where
    S: RecordStore + ?Sized,
{
    let mut report = IngestReport {
        bytes_read: text.len() as u64,
        ..IngestReport::default()
    };

    let mut extractor = Extractor::new(text);
    for record in extractor.by_ref() {
        match store.insert_if_absent(&record) {
            Ok(true) => report.inserted += 1,
            Ok(false) => report.duplicates += 1,
            Err(e) => {
                tracing::warn!(
                    hash = record.short_hash(),
                    filename = %record.filename,
                    error = %e,
                    "Could not store change"
                );
                report.failed += 1;
            }
        }
    }
    report.extract = extractor.stats();

    report
}

/// Reads the prompt log under a consumption policy
#[derive(Debug, Clone)]
pub struct LogIngestor {
    log_path: PathBuf,
}

impl LogIngestor {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Run one pass under `policy`, loading and saving the offset as needed
    pub fn run<S>(
        &self,
        policy: ConsumptionPolicy,
        store: &mut S,
    ) -> Result<IngestReport, IngestError>
    where
        S: RecordStore + OffsetStore,
    {
        match policy {
            ConsumptionPolicy::FullRescan => self.process_all(store),
            ConsumptionPolicy::Incremental => {
                let offset = store.load_offset()?;
                let report = self.process_from(store, offset)?;
                if report.next_offset != offset {
                    store.save_offset(report.next_offset)?;
                }
                Ok(report)
            }
        }
    }

    /// Full rescan: ingest the whole log, then truncate it
    ///
    /// A missing or blank log yields an empty report and is left alone.
    /// A log that is not valid UTF-8 is an error and is left alone.
    /// Failing to truncate is logged, not fatal: records are already
    /// stored and re-ingesting them is a no-op.
    pub fn process_all<S>(&self, store: &mut S) -> Result<IngestReport, IngestError>
    where
        S: RecordStore + ?Sized,
    {
        let read_error = |source: io::Error| IngestError::ReadLog {
            path: self.log_path.clone(),
            source,
        };

        let bytes = match fs::read(&self.log_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %self.log_path.display(), "Prompt log not found");
                return Ok(IngestReport::default());
            }
            Err(e) => return Err(read_error(e)),
        };
        // the log is cleared afterwards, so undecodable text must not be lost
        let content = String::from_utf8(bytes)
            .map_err(|e| read_error(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        if content.trim().is_empty() {
            tracing::info!("No content to process");
            return Ok(IngestReport::default());
        }

        tracing::info!(bytes = content.len(), "Processing entire prompt log");
        let mut report = ingest_text(&content, store);

        match File::create(&self.log_path) {
            Ok(_) => {
                report.cleared = true;
                tracing::info!("Cleared prompt log after processing");
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.log_path.display(),
                    error = %e,
                    "Could not clear prompt log"
                );
            }
        }

        Ok(report)
    }

    /// Incremental: ingest the bytes in `[offset, len)` of the log
    ///
    /// If the log is missing or not longer than `offset` there is nothing
    /// to do and `next_offset` stays at `offset`.
    pub fn process_from<S>(&self, store: &mut S, offset: u64) -> Result<IngestReport, IngestError>
    where
        S: RecordStore + ?Sized,
    {
        let read_error = |source: io::Error| IngestError::ReadLog {
            path: self.log_path.clone(),
            source,
        };

        let mut file = match File::open(&self.log_path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %self.log_path.display(), "Prompt log not found");
                return Ok(IngestReport {
                    next_offset: offset,
                    ..IngestReport::default()
                });
            }
            Err(e) => return Err(read_error(e)),
        };

        let size = file.metadata().map_err(read_error)?.len();
        if size <= offset {
            tracing::debug!(size, offset, "No new log content");
            return Ok(IngestReport {
                next_offset: offset,
                ..IngestReport::default()
            });
        }

        // bytes appended after `size` was taken are left for the next run
        let mut buf = Vec::new();
        file.seek(SeekFrom::Start(offset)).map_err(read_error)?;
        file.take(size - offset)
            .read_to_end(&mut buf)
            .map_err(read_error)?;
        let text = String::from_utf8_lossy(&buf);

        tracing::info!(offset, new_bytes = size - offset, "Processing new log content");
        let report = ingest_text(&text, store);

        Ok(IngestReport {
            bytes_read: size - offset,
            next_offset: size,
            ..report
        })
    }
}
