//! Project layout
//!
//! Where the store and the prompt log live, relative to a project root.

use std::path::{Path, PathBuf};

use crate::constants::{DATA_DIR, DB_FILE, LOG_FILE};

/// Resolved on-disk locations for one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    /// Project root (usually the git work tree)
    pub root: PathBuf,

    /// `<root>/verba`
    pub data_dir: PathBuf,

    /// Change record store
    pub db_path: PathBuf,

    /// Prompt log written by the editor integration
    pub log_path: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let data_dir = root.join(DATA_DIR);
        Self {
            db_path: data_dir.join(DB_FILE),
            log_path: data_dir.join(LOG_FILE),
            data_dir,
            root,
        }
    }

    /// Use a store outside the data directory
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    /// Use a prompt log outside the data directory
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self::new(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let layout = ProjectLayout::new("/repo");
        assert_eq!(layout.data_dir, PathBuf::from("/repo/verba"));
        assert_eq!(layout.db_path, PathBuf::from("/repo/verba/changes.db"));
        assert_eq!(layout.log_path, PathBuf::from("/repo/verba/prompts.txt"));
        assert_eq!(layout.root(), Path::new("/repo"));
    }

    #[test]
    fn test_overrides() {
        let layout = ProjectLayout::new("/repo")
            .with_db_path("/tmp/other.db")
            .with_log_path("/tmp/log.txt");
        assert_eq!(layout.db_path, PathBuf::from("/tmp/other.db"));
        assert_eq!(layout.log_path, PathBuf::from("/tmp/log.txt"));
        assert_eq!(layout.data_dir, PathBuf::from("/repo/verba"));
    }
}
