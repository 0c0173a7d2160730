//! TestProject helper for integration tests.
//!
//! Provides a temporary project directory with a `verba/` data directory.

use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use verba::config::ProjectLayout;
use verba::model::ChangeRecord;
use verba::store::{RecordStore, SqliteStore};

/// A temporary project for testing.
///
/// The directory is automatically cleaned up when the TestProject is dropped.
pub struct TestProject {
    dir: TempDir,
    layout: ProjectLayout,
}

impl TestProject {
    /// Create a project with an initialized store.
    pub fn new() -> Self {
        let project = Self::uninitialized();
        SqliteStore::create(&project.layout.db_path).expect("Failed to initialize store");
        project
    }

    /// Create a project without a store.
    pub fn uninitialized() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let layout = ProjectLayout::new(dir.path());
        std::fs::create_dir_all(&layout.data_dir).expect("Failed to create data directory");
        Self { dir, layout }
    }

    /// Get the path to the project root.
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Open the project's store.
    pub fn store(&self) -> SqliteStore {
        SqliteStore::open(&self.layout.db_path).expect("Failed to open store")
    }

    /// Path for an extra store file inside the project (for merges).
    pub fn extra_store_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(format!("{}.db", name))
    }

    /// Replace the prompt log.
    pub fn write_log(&self, content: &str) {
        std::fs::write(&self.layout.log_path, content).expect("Failed to write log");
    }

    /// Append to the prompt log.
    pub fn append_log(&self, content: &str) {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.layout.log_path)
            .expect("Failed to open log");
        file.write_all(content.as_bytes()).expect("Failed to append to log");
    }

    /// Read the prompt log.
    ///
    /// Returns an empty string if the file does not exist.
    pub fn read_log(&self) -> String {
        std::fs::read_to_string(&self.layout.log_path).unwrap_or_default()
    }

    /// Hashes currently in the project's store.
    pub fn hashes(&self) -> BTreeSet<String> {
        hashes_at(&self.layout.db_path)
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Hashes stored in the store at `path`.
pub fn hashes_at(path: &Path) -> BTreeSet<String> {
    SqliteStore::open(path)
        .expect("Failed to open store")
        .scan_all()
        .expect("Failed to scan store")
        .into_iter()
        .map(|record| record.change_hash)
        .collect()
}

/// Create a store at `path` holding `records`.
pub fn store_at(path: &Path, records: &[ChangeRecord]) -> SqliteStore {
    let mut store = SqliteStore::create(path).expect("Failed to create store");
    for record in records {
        store.insert_if_absent(record).expect("Failed to insert record");
    }
    store
}

/// Build a record with a fixed prompt.
pub fn record(filename: &str, content: &str, timestamp: &str) -> ChangeRecord {
    ChangeRecord::build(filename, content, timestamp, "test prompt").expect("Invalid test record")
}

/// Render one prompt block in log format.
///
/// Each file section is followed by a dashed separator.
pub fn prompt_block(timestamp: &str, prompt: &str, files: &[(&str, &str)]) -> String {
    let mut block = format!("[{}] User Prompt: {}\n", timestamp, prompt);
    for (filename, content) in files {
        block.push_str(&format!("FILE: {}\n{}\n", filename, content));
        block.push_str("--------------------------------\n");
    }
    block
}
