//! Data models for Verba
//!
//! Storage-independent structures: the change record, its identity rule,
//! and the hash-keyed set used for union merges.

mod change_record;
mod record_set;

pub use change_record::{ChangeRecord, change_hash, format_timestamp, parse_timestamp};
pub use record_set::{RecordSet, sort_for_display};
