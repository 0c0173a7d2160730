//! Prompt log extraction
//!
//! Turns the free-text prompt log into [`ChangeRecord`]s. Lines are
//! classified one at a time (no lookahead) and fed to a two-slot
//! [`ParserState`]; the [`Extractor`] drives that state over a whole text
//! and yields records lazily.
//!
//! Log shape:
//! ```text
//! [2024-01-01T00:00:00Z] User Prompt: fix bug
//! FILE: a.py
//!   12 + print('x')
//! --------
//! FILE: b.py
//! ...
//! ```

mod state;


pub use state::{Block, Flushed, ParserState, Section, Slot};

use std::collections::VecDeque;
use std::iter::FusedIterator;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::ChangeRecord;

/// `[<timestamp>] User Prompt: <text>`
///
/// Groups:
/// 1. timestamp text (anything but `]`)
/// 2. prompt text (non-empty)
static PROMPT_HEADER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[([^\]]+)\] User Prompt: (.+)$").expect("Invalid prompt header regex")
});

/// `FILE: <name>`
static FILE_HEADER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^FILE: (.+)$").expect("Invalid file header regex"));

/// A line made only of dashes
static SEPARATOR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-+$").expect("Invalid separator regex"));

/// Prompt header prefix, used to spot headers with no prompt text
static PROMPT_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[[^\]]+\] User Prompt:").expect("Invalid prompt prefix regex")
});

/// Classification of one log line
///
/// Patterns are tried in the order of the variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// Starts a new prompt block
    PromptHeader { timestamp: &'a str, prompt: &'a str },

    /// Opens a file section within the block
    FileHeader { filename: &'a str },

    /// Dashes only, discarded
    Separator,

    /// Looks like a header but is missing its value (e.g. `FILE:`),
    /// neither a header nor content
    MalformedHeader,

    /// Anything else, including blank lines
    Content(&'a str),
}

impl<'a> Line<'a> {
    pub fn classify(line: &'a str) -> Self {
        if let Some(caps) = PROMPT_HEADER_REGEX.captures(line)
            && let (Some(timestamp), Some(prompt)) = (caps.get(1), caps.get(2))
        {
            return Line::PromptHeader {
                timestamp: timestamp.as_str(),
                prompt: prompt.as_str(),
            };
        }

        if let Some(filename) = FILE_HEADER_REGEX.captures(line).and_then(|caps| caps.get(1)) {
            return Line::FileHeader {
                filename: filename.as_str(),
            };
        }

        if SEPARATOR_REGEX.is_match(line) {
            return Line::Separator;
        }

        if line.starts_with(crate::constants::markers::FILE_PREFIX)
            || PROMPT_PREFIX_REGEX.is_match(line)
        {
            return Line::MalformedHeader;
        }

        Line::Content(line)
    }
}

/// Counters for one extraction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    /// Lines consumed so far
    pub lines: usize,

    /// Records yielded
    pub emitted: usize,

    /// Flushed sections dropped for a missing field or blank content
    pub rejected: usize,
}

/// Lazy, single-pass record extraction over a log text
///
/// Records come out in discovery order. The iterator is fused; once it
/// returns `None` the state has been flushed and the pass is over.
#[derive(Debug)]
pub struct Extractor<'a> {
    lines: std::str::Split<'a, char>,
    state: ParserState<'a>,
    ready: VecDeque<ChangeRecord>,
    stats: ExtractStats,
    finished: bool,
}

impl<'a> Extractor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.split('\n'),
            state: ParserState::default(),
            ready: VecDeque::new(),
            stats: ExtractStats::default(),
            finished: false,
        }
    }

    /// Counters so far (final once the iterator is exhausted)
    pub fn stats(&self) -> ExtractStats {
        self.stats
    }

    /// Records emitted so far
    pub fn emitted(&self) -> usize {
        self.stats.emitted
    }

    fn accept(&mut self, flushed: Vec<Flushed<'a>>) {
        for section in flushed {
            let filename = section.filename;
            match section.into_record() {
                Some(record) => {
                    tracing::debug!(hash = record.short_hash(), filename, "Extracted change");
                    self.stats.emitted += 1;
                    self.ready.push_back(record);
                }
                None => {
                    tracing::debug!(filename, "Dropped section with blank content");
                    self.stats.rejected += 1;
                }
            }
        }
    }
}

impl Iterator for Extractor<'_> {
    type Item = ChangeRecord;

    fn next(&mut self) -> Option<ChangeRecord> {
        loop {
            if let Some(record) = self.ready.pop_front() {
                return Some(record);
            }
            if self.finished {
                return None;
            }

            match self.lines.next() {
                Some(line) => {
                    self.stats.lines += 1;
                    let flushed = self.state.step(line);
                    self.accept(flushed);
                }
                None => {
                    self.finished = true;
                    let flushed = std::mem::take(&mut self.state).finish();
                    self.accept(flushed);
                }
            }
        }
    }
}

impl FusedIterator for Extractor<'_> {}

/// Extract every record from `text` eagerly
pub fn extract(text: &str) -> (Vec<ChangeRecord>, ExtractStats) {
    let mut extractor = Extractor::new(text);
    let records: Vec<ChangeRecord> = extractor.by_ref().collect();
    (records, extractor.stats())
}
