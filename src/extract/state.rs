//! Parser state for log extraction
//!
//! Two slots hold open file sections: `current`, and `pending` for a second
//! `FILE:` header that arrives while `current` is still open. Flushes happen
//! on exactly three events: a new prompt header, a file header while
//! `current` is open, and end of input. A flushed slot is closed.

use super::Line;
use crate::model::ChangeRecord;

/// Timestamp and prompt of the block in effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block<'a> {
    pub timestamp: &'a str,
    pub prompt: &'a str,
}

/// An open file section and its accumulated lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    pub filename: &'a str,
    pub lines: Vec<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Slot<'a> {
    #[default]
    Empty,
    Open(Section<'a>),
}

impl<'a> Slot<'a> {
    fn open(filename: &'a str) -> Self {
        Slot::Open(Section {
            filename,
            lines: Vec::new(),
        })
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Slot::Open(_))
    }

    fn push(&mut self, line: &'a str) {
        if let Slot::Open(section) = self {
            section.lines.push(line);
        }
    }

    fn take(&mut self) -> Option<Section<'a>> {
        match std::mem::take(self) {
            Slot::Open(section) => Some(section),
            Slot::Empty => None,
        }
    }
}

/// A section closed out under a block, ready to become a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flushed<'a> {
    pub filename: &'a str,
    pub content: String,
    pub timestamp: &'a str,
    pub prompt: &'a str,
}

impl Flushed<'_> {
    /// `None` if a field is empty or the content is blank
    pub fn into_record(self) -> Option<ChangeRecord> {
        ChangeRecord::build(self.filename, &self.content, self.timestamp, self.prompt)
    }
}

/// State of one extraction pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserState<'a> {
    /// Block in effect, `None` before the first prompt header
    pub block: Option<Block<'a>>,
    pub current: Slot<'a>,
    pub pending: Slot<'a>,
}

impl<'a> ParserState<'a> {
    /// Feed one line, returning the sections it closed
    pub fn step(&mut self, line: &'a str) -> Vec<Flushed<'a>> {
        match Line::classify(line) {
            Line::PromptHeader { timestamp, prompt } => {
                // closes under the previous block, not the new one
                let flushed = self.flush_all();
                self.block = Some(Block { timestamp, prompt });
                flushed
            }
            Line::FileHeader { filename } => {
                let had_current = self.current.is_open();
                let flushed = self.flush_all();
                if had_current {
                    self.pending = Slot::open(filename);
                } else {
                    self.current = Slot::open(filename);
                }
                flushed
            }
            Line::Separator | Line::MalformedHeader => Vec::new(),
            Line::Content(text) => {
                self.current.push(text);
                self.pending.push(text);
                Vec::new()
            }
        }
    }

    /// Close both slots at end of input
    pub fn finish(mut self) -> Vec<Flushed<'a>> {
        self.flush_all()
    }

    /// Close `current` then `pending`
    ///
    /// Sections with no lines, or opened before any prompt header, vanish
    /// without producing anything.
    fn flush_all(&mut self) -> Vec<Flushed<'a>> {
        let block = self.block;
        [self.current.take(), self.pending.take()]
            .into_iter()
            .flatten()
            .filter(|section| !section.lines.is_empty())
            .filter_map(|section| {
                block.map(|block| Flushed {
                    filename: section.filename,
                    content: section.lines.join("\n"),
                    timestamp: block.timestamp,
                    prompt: block.prompt,
                })
            })
            .collect()
    }
}
