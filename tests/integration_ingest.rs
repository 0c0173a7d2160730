//! Log ingestion integration tests.
//!
//! Tests for full-rescan and incremental processing against a SQLite store.

#[path = "common/mod.rs"]
mod common;

use common::{TestProject, prompt_block};
use verba::ingest::{ConsumptionPolicy, LogIngestor};
use verba::model::change_hash;
use verba::store::{OffsetStore, RecordStore, SqliteStore, StoreError};

#[test]
fn test_process_single_change() {
    let project = TestProject::new();
    project.write_log("[2024-01-01T00:00:00Z] User Prompt: fix bug\nFILE: a.py\n1 + print('x')\n");

    let mut store = project.store();
    let report = LogIngestor::new(&project.layout().log_path)
        .run(ConsumptionPolicy::FullRescan, &mut store)
        .expect("process should succeed");

    assert_eq!(report.changes(), 1);
    assert_eq!(report.inserted, 1);

    let records = store.scan_all().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].filename, "a.py");
    assert_eq!(records[0].prompt, "fix bug");
    assert_eq!(
        records[0].change_hash,
        change_hash("a.py", "1 + print('x')\n", "2024-01-01T00:00:00Z")
    );
    assert!(!records[0].is_committed);
    assert!(records[0].commit_hash.is_none());
}

#[test]
fn test_process_clears_log() {
    let project = TestProject::new();
    project.write_log(&prompt_block("2024-01-01T00:00:00Z", "p", &[("a.py", "x")]));

    let mut store = project.store();
    let report = LogIngestor::new(&project.layout().log_path)
        .process_all(&mut store)
        .unwrap();

    assert!(report.cleared);
    assert_eq!(project.read_log(), "");
}

#[test]
fn test_process_same_content_twice_adds_nothing() {
    let project = TestProject::new();
    let log = format!(
        "{}{}",
        prompt_block("2024-01-01T00:00:00Z", "first", &[("a.py", "x"), ("b.py", "y")]),
        prompt_block("2024-01-02T00:00:00Z", "second", &[("c.py", "z")]),
    );
    let ingestor = LogIngestor::new(&project.layout().log_path);

    project.write_log(&log);
    let first = ingestor.process_all(&mut project.store()).unwrap();
    let after_first = project.hashes();

    project.write_log(&log);
    let second = ingestor.process_all(&mut project.store()).unwrap();

    assert_eq!(first.inserted, 3);
    assert_eq!(second.changes(), 3);
    assert_eq!(second.inserted, 0);
    assert_eq!(project.hashes(), after_first);
}

#[test]
fn test_process_without_log_is_success() {
    let project = TestProject::new();

    let report = LogIngestor::new(&project.layout().log_path)
        .process_all(&mut project.store())
        .expect("missing log is not an error");

    assert_eq!(report.changes(), 0);
    assert!(project.hashes().is_empty());
}

#[test]
fn test_process_requires_initialized_store() {
    let project = TestProject::uninitialized();

    let err = SqliteStore::open(&project.layout().db_path).unwrap_err();
    assert!(matches!(err, StoreError::NotInitialized(_)));
}

#[test]
fn test_incremental_offset_survives_reopen() {
    let project = TestProject::new();
    let ingestor = LogIngestor::new(&project.layout().log_path);
    let first_block = prompt_block("2024-01-01T00:00:00Z", "first", &[("a.py", "x")]);

    project.write_log(&first_block);
    ingestor
        .run(ConsumptionPolicy::Incremental, &mut project.store())
        .unwrap();
    assert_eq!(
        project.store().load_offset().unwrap(),
        first_block.len() as u64
    );

    project.append_log(&prompt_block("2024-01-02T00:00:00Z", "second", &[("b.py", "y")]));
    let report = ingestor
        .run(ConsumptionPolicy::Incremental, &mut project.store())
        .unwrap();

    assert_eq!(report.changes(), 1);
    assert_eq!(project.hashes().len(), 2);
    // incremental mode leaves the log in place
    assert!(project.read_log().contains("User Prompt: first"));
}

#[test]
fn test_reset_offset_rescans_without_duplicates() {
    let project = TestProject::new();
    let ingestor = LogIngestor::new(&project.layout().log_path);
    project.write_log(&prompt_block(
        "2024-01-01T00:00:00Z",
        "p",
        &[("a.py", "x"), ("b.py", "y")],
    ));

    ingestor
        .run(ConsumptionPolicy::Incremental, &mut project.store())
        .unwrap();
    project.store().save_offset(0).unwrap();
    let rerun = ingestor
        .run(ConsumptionPolicy::Incremental, &mut project.store())
        .unwrap();

    assert_eq!(rerun.changes(), 2);
    assert_eq!(rerun.inserted, 0);
    assert_eq!(project.hashes().len(), 2);
}

#[test]
fn test_blank_sections_are_not_stored() {
    let project = TestProject::new();
    project.write_log(
        "[2024-01-01T00:00:00Z] User Prompt: p\nFILE: empty.py\n   \n\nFILE: real.py\n1 + x",
    );

    let report = LogIngestor::new(&project.layout().log_path)
        .process_all(&mut project.store())
        .unwrap();

    assert_eq!(report.extract.rejected, 1);
    let records = project.store().scan_all().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].filename, "real.py");
}

#[test]
fn test_incremental_after_truncating_process_does_nothing() {
    let project = TestProject::new();
    let ingestor = LogIngestor::new(&project.layout().log_path);
    let block = prompt_block("2024-01-01T00:00:00Z", "p", &[("a.py", "x")]);

    project.write_log(&block);
    ingestor
        .run(ConsumptionPolicy::Incremental, &mut project.store())
        .unwrap();
    ingestor
        .run(ConsumptionPolicy::FullRescan, &mut project.store())
        .unwrap();
    assert_eq!(project.read_log(), "");

    let report = ingestor
        .run(ConsumptionPolicy::Incremental, &mut project.store())
        .unwrap();

    assert_eq!(report.bytes_read, 0);
    assert_eq!(report.changes(), 0);
    assert_eq!(report.next_offset, block.len() as u64);
    assert_eq!(project.store().load_offset().unwrap(), block.len() as u64);
    assert_eq!(project.hashes().len(), 1);
}
