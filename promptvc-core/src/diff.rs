// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Diff Engine - Positional Line Diff
//!
//! Compares two texts line by line at equal positions. This is not a
//! minimal-edit (LCS) diff: inserting one line near the top turns every
//! following line into a removed/added pair. Callers rely on that exact
//! output, so it stays positional.

use serde::{Deserialize, Serialize};

/// Type of change for a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineChange {
    /// Line only present in the "after" text at this position
    Added,
    /// Line only present in the "before" text at this position
    Removed,
    /// Same line at the same position
    Unchanged,
}

/// A single line in a diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffEntry {
    /// Change type
    #[serde(rename = "type")]
    pub change: LineChange,
    /// Line content (without newline)
    pub content: String,
    /// 1-indexed position shared by both texts
    pub line_number: usize,
}

impl DiffEntry {
    fn new(change: LineChange, content: &str, line_number: usize) -> Self {
        Self {
            change,
            content: content.to_string(),
            line_number,
        }
    }
}

/// Diff statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub lines_added: usize,
    pub lines_removed: usize,
    pub lines_unchanged: usize,
}

impl DiffStats {
    /// Count entries by change type
    pub fn from_entries(entries: &[DiffEntry]) -> Self {
        let mut stats = Self::default();
        for entry in entries {
            match entry.change {
                LineChange::Added => stats.lines_added += 1,
                LineChange::Removed => stats.lines_removed += 1,
                LineChange::Unchanged => stats.lines_unchanged += 1,
            }
        }
        stats
    }

    /// No added or removed lines
    pub fn is_identical(&self) -> bool {
        self.lines_added == 0 && self.lines_removed == 0
    }

    /// Net lines changed
    pub fn net_change(&self) -> i64 {
        self.lines_added as i64 - self.lines_removed as i64
    }
}

/// Positional line diff
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffEngine;

impl DiffEngine {
    pub fn new() -> Self {
        Self
    }

    /// Diff two texts. `before` lines that differ from `after` at the same
    /// index produce a `Removed` entry followed by an `Added` entry, both
    /// carrying that index's line number.
    pub fn diff_text(&self, before: &str, after: &str) -> Vec<DiffEntry> {
        // split('\n') keeps a trailing empty line and maps "" to [""]
        let old_lines: Vec<&str> = before.split('\n').collect();
        let new_lines: Vec<&str> = after.split('\n').collect();
        let len = old_lines.len().max(new_lines.len());

        let mut entries = Vec::with_capacity(len);
        for i in 0..len {
            let line_number = i + 1;
            match (old_lines.get(i), new_lines.get(i)) {
                (None, Some(new)) => {
                    entries.push(DiffEntry::new(LineChange::Added, new, line_number));
                }
                (Some(old), None) => {
                    entries.push(DiffEntry::new(LineChange::Removed, old, line_number));
                }
                (Some(old), Some(new)) if old == new => {
                    entries.push(DiffEntry::new(LineChange::Unchanged, old, line_number));
                }
                (Some(old), Some(new)) => {
                    entries.push(DiffEntry::new(LineChange::Removed, old, line_number));
                    entries.push(DiffEntry::new(LineChange::Added, new, line_number));
                }
                (None, None) => {}
            }
        }

        entries
    }

    /// Format entries with `+`/`-`/space prefixes, one line each
    pub fn render(&self, entries: &[DiffEntry]) -> String {
        let mut output = String::new();
        for entry in entries {
            let prefix = match entry.change {
                LineChange::Unchanged => ' ',
                LineChange::Added => '+',
                LineChange::Removed => '-',
            };
            output.push_str(&format!("{:>4} {}{}\n", entry.line_number, prefix, entry.content));
        }
        output
    }
}
