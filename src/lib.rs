//! Verba - prompt-driven change records
//!
//! Records developer edit activity (a prompt plus the file diffs it
//! produced) from a free-text log into a content-addressed store, and
//! merges independently grown stores as a git merge driver.
//!
//! This library provides:
//! - [`extract`]: Log line classification and record extraction
//! - [`model`]: The change record, its identity rule, and record sets
//! - [`store`]: The record store gateway and its SQLite implementation
//! - [`ingest`]: Full-rescan and incremental consumption of the log
//! - [`merge`]: Union merge of stores
//! - [`cli`]: Command-line surface

pub mod cli;
pub mod config;
pub mod constants;
pub mod extract;
pub mod ingest;
pub mod merge;
pub mod model;
pub mod store;
