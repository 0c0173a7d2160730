//! Union merge of change record stores
//!
//! Every source is read in full, the records are concatenated, and each is
//! inserted into the target only if its hash is absent. Nothing already in
//! the target is overwritten, so the result is the hash-keyed union of the
//! inputs regardless of source order, batching, or repetition.
//!
//! Used as a git merge driver: `verba merge %O %A %B` writes into `%A`.

use std::path::Path;

use crate::model::{ChangeRecord, RecordSet};
use crate::store::{RecordStore, SqliteStore, StoreError};

/// Records read from one input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSource {
    /// Display name ("ancestor", "ours", "theirs", ...)
    pub label: String,
    pub records: Vec<ChangeRecord>,
}

impl MergeSource {
    pub fn new(label: impl Into<String>, records: Vec<ChangeRecord>) -> Self {
        Self {
            label: label.into(),
            records,
        }
    }

    /// Read a store file as a merge input
    ///
    /// A missing, empty or unreadable file contributes no records.
    pub fn read(label: impl Into<String>, path: &Path) -> Self {
        let label = label.into();
        let records = match SqliteStore::open_source(path).and_then(|store| match store {
            Some(store) => store.scan_all(),
            None => Ok(Vec::new()),
        }) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    source = %label,
                    path = %path.display(),
                    error = %e,
                    "Could not read merge source"
                );
                Vec::new()
            }
        };

        tracing::info!(source = %label, records = records.len(), "Read merge source");
        Self { label, records }
    }
}

/// Outcome of a merge into a target store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Records read per source, in input order
    pub source_counts: Vec<(String, usize)>,

    /// Rows newly added to the target
    pub inserted: usize,

    /// Records whose hash the target already held
    pub already_present: usize,

    /// Records skipped after an insert error
    pub failed: usize,
}

/// Hash-keyed union of any number of record sequences
pub fn union<I, S>(sources: I) -> RecordSet
where
    I: IntoIterator<Item = S>,
    S: IntoIterator<Item = ChangeRecord>,
{
    sources.into_iter().flatten().collect()
}

/// Insert every source record into `target`, absent-only
///
/// Per-record failures are logged and counted; they never stop the merge.
pub fn merge_into<T>(sources: Vec<MergeSource>, target: &mut T) -> MergeReport
where
    T: RecordStore + ?Sized,
{
    let mut report = MergeReport {
        source_counts: sources
            .iter()
            .map(|source| (source.label.clone(), source.records.len()))
            .collect(),
        ..MergeReport::default()
    };

    for record in sources.into_iter().flat_map(|source| source.records) {
        match target.insert_if_absent(&record) {
            Ok(true) => report.inserted += 1,
            Ok(false) => report.already_present += 1,
            Err(e) => {
                tracing::warn!(
                    hash = record.short_hash(),
                    filename = %record.filename,
                    error = %e,
                    "Could not insert record"
                );
                report.failed += 1;
            }
        }
    }

    report
}

/// Merge store files into `output`
///
/// All sources are read before the target is opened, so `output` may be
/// one of the inputs. Only failing to open or create the target is an
/// error.
pub fn merge_paths(sources: &[(&str, &Path)], output: &Path) -> Result<MergeReport, StoreError> {
    let sources: Vec<MergeSource> = sources
        .iter()
        .map(|(label, path)| MergeSource::read(*label, path))
        .collect();

    let mut target = SqliteStore::create(output)?;
    let report = merge_into(sources, &mut target);

    tracing::info!(
        inserted = report.inserted,
        already_present = report.already_present,
        failed = report.failed,
        "Merged into {}",
        output.display()
    );
    Ok(report)
}

/// Three-way merge driver entry: ancestor (`%O`), ours (`%A`), theirs (`%B`)
pub fn merge_three(
    ancestor: &Path,
    ours: &Path,
    theirs: &Path,
    output: &Path,
) -> Result<MergeReport, StoreError> {
    merge_paths(
        &[("ancestor", ancestor), ("ours", ours), ("theirs", theirs)],
        output,
    )
}
