//! Command history index
//!
//! Remembers where each entered command lives in the buffer so the host
//! can jump between them. Spans are appended in buffer order, which keeps
//! the index sorted and lets lookups use binary search.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The buffer regions holding one entered command. A single-line command
/// has one region; a command continued across lines has one region per
/// line, excluding the continuation prompts between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandSpan {
    pub regions: Vec<(usize, usize)>,
}

impl CommandSpan {
    pub fn new(regions: Vec<(usize, usize)>) -> Self {
        Self { regions }
    }

    /// Offset of the first character of the command.
    pub fn begin(&self) -> usize {
        self.regions.first().map(|r| r.0).unwrap_or(0)
    }

    /// Offset one past the last character of the command.
    pub fn end(&self) -> usize {
        self.regions.last().map(|r| r.1).unwrap_or(0)
    }

    /// The command text, with continuation-line regions joined by newlines.
    pub fn text(&self, buffer: &str) -> String {
        let chars: Vec<char> = buffer.chars().collect();
        let mut parts = Vec::with_capacity(self.regions.len());
        for &(begin, end) in &self.regions {
            let end = end.min(chars.len());
            let begin = begin.min(end);
            parts.push(chars[begin..end].iter().collect::<String>());
        }
        parts.join("\n")
    }
}

/// Append-only index of command spans, sorted by start offset.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryIndex {
    spans: Vec<CommandSpan>,
}

impl HistoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandSpan> {
        self.spans.iter()
    }

    pub fn last(&self) -> Option<&CommandSpan> {
        self.spans.last()
    }

    /// Append a span. Spans arrive in buffer order; an out-of-order span
    /// would break the binary searches, so it is dropped.
    pub fn append(&mut self, span: CommandSpan) {
        if span.regions.is_empty() {
            return;
        }
        if let Some(prev) = self.spans.last() {
            if span.begin() < prev.begin() {
                debug!(
                    begin = span.begin(),
                    prev = prev.begin(),
                    "dropping out-of-order history span"
                );
                return;
            }
        }
        self.spans.push(span);
    }

    /// The last command whose final span ends at or before `pos`. An offset
    /// inside a command does not match that command.
    pub fn nearest_before(&self, pos: usize) -> Option<&CommandSpan> {
        let idx = self.spans.partition_point(|s| s.end() <= pos);
        idx.checked_sub(1).map(|i| &self.spans[i])
    }

    /// The first command whose first span begins at or after `pos`.
    pub fn nearest_after(&self, pos: usize) -> Option<&CommandSpan> {
        let idx = self.spans.partition_point(|s| s.begin() < pos);
        self.spans.get(idx)
    }

    /// Persist the index as JSON.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string(self)?;
        fs::write(path, json)
            .with_context(|| format!("writing history index to {}", path.display()))?;
        Ok(())
    }

    /// Load an index previously written by [`HistoryIndex::save`].
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading history index from {}", path.display()))?;
        let index = serde_json::from_str(&json)
            .with_context(|| format!("parsing history index from {}", path.display()))?;
        Ok(index)
    }
}
