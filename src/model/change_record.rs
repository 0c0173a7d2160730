//! Change record data model

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::constants::SHORT_HASH_LEN;

/// Timestamp layouts carrying an explicit offset (`%#z` also accepts `Z`)
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f%#z"];

/// Timestamp layouts without an offset, interpreted as UTC
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// One file's change within one logged prompt event
///
/// Identity is `change_hash`: two records with the same hash are the same
/// record, wherever they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    /// SHA-256 (hex) over filename, content and the raw timestamp text
    pub change_hash: String,

    /// Path the change applies to
    pub filename: String,

    /// Diff or full content, never blank
    pub file_change: String,

    /// When the prompt was logged
    pub timestamp: DateTime<Utc>,

    /// User intent that produced the change
    pub prompt: String,

    /// Set by commit tooling, never by verba itself
    pub is_committed: bool,

    /// Commit the change landed in, once committed
    pub commit_hash: Option<String>,
}

impl ChangeRecord {
    /// Build a record from one flushed file section
    ///
    /// Returns `None` when any field is empty or the content is only
    /// whitespace. An unparsable timestamp falls back to the current time;
    /// the hash is always computed over the raw text.
    pub fn build(filename: &str, file_change: &str, timestamp: &str, prompt: &str) -> Option<Self> {
        if filename.is_empty() || timestamp.is_empty() || prompt.is_empty() {
            return None;
        }
        if file_change.trim().is_empty() {
            return None;
        }

        let parsed = parse_timestamp(timestamp).unwrap_or_else(|| {
            tracing::debug!(timestamp, "Unparsable timestamp, using current time");
            Utc::now()
        });

        Some(Self {
            change_hash: change_hash(filename, file_change, timestamp),
            filename: filename.to_string(),
            file_change: file_change.to_string(),
            timestamp: parsed,
            prompt: prompt.to_string(),
            is_committed: false,
            commit_hash: None,
        })
    }

    /// Abbreviated hash for logs and listings
    pub fn short_hash(&self) -> &str {
        self.change_hash
            .get(..SHORT_HASH_LEN)
            .unwrap_or(&self.change_hash)
    }

    /// Timestamp in the canonical stored form
    pub fn timestamp_text(&self) -> String {
        format_timestamp(&self.timestamp)
    }
}

/// Content identity of a change
///
/// Hex SHA-256 of `filename ++ file_change ++ timestamp`.
pub fn change_hash(filename: &str, file_change: &str, timestamp: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(filename.as_bytes());
    hasher.update(file_change.as_bytes());
    hasher.update(timestamp.as_bytes());
    hex::encode(hasher.finalize())
}

/// Parse an ISO-8601-like timestamp
///
/// Accepts RFC 3339, `T` or space separated date-times with or without
/// offset and fractional seconds, and bare dates. Values without an offset
/// are taken as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Canonical stored form: RFC 3339, microseconds, `+00:00`
///
/// Fixed width, so text order equals time order.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, false)
}
