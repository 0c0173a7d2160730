//! Verba-wide constants
//!
//! Centralized definitions for on-disk names, store keys and log markers.

/// Directory (relative to the project root) holding the store and the log
pub const DATA_DIR: &str = "verba";

/// Store file name inside [`DATA_DIR`]
pub const DB_FILE: &str = "changes.db";

/// Prompt log file name inside [`DATA_DIR`]
pub const LOG_FILE: &str = "prompts.txt";

/// Environment variable overriding the project root
pub const PROJECT_ROOT_ENV: &str = "VERBA_PROJECT_ROOT";

/// `processing_state` key holding the consumed log offset
pub const OFFSET_KEY: &str = "last_position";

/// Markers recognized in the prompt log
pub mod markers {
    /// Prefix of a file section header
    pub const FILE_PREFIX: &str = "FILE:";
}

/// Number of hex characters shown when a hash is abbreviated
pub const SHORT_HASH_LEN: usize = 8;
