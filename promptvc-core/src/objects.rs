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

//! Version Objects
//!
//! Full-text snapshots of a prompt with commit metadata and a single parent
//! link. Only the tag set may grow after a version is created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;

/// Length of the abbreviated id (like git short hash)
pub const SHORT_ID_LEN: usize = 8;

/// Version ID - opaque identifier, never reused
///
/// Freshly generated ids are random v4 UUIDs in simple (hyphen-less) form.
/// Imported ids are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    /// Generate a new collision-resistant id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Wrap an existing id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated id for messages and display
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(SHORT_ID_LEN) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }

    /// Check for an empty id (only possible through import)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for VersionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VersionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for VersionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VersionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for VersionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Version - immutable snapshot of a prompt's content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    /// Unique id
    pub id: VersionId,
    /// Logical document this version belongs to
    pub prompt_id: String,
    /// Full text at this point
    pub content: String,
    /// Creation time, recorded once
    pub timestamp: DateTime<Utc>,
    /// Commit message (may be empty)
    pub commit_message: String,
    /// Writer of this version
    pub author: String,
    /// Predecessor on its branch, `None` for the first version of a lineage
    pub parent_id: Option<VersionId>,
    /// Branch this version was committed to
    pub branch_name: String,
    /// Free-text labels; tagged versions are never pruned
    pub tags: BTreeSet<String>,
    /// Retention-exempt marker
    pub is_checkpoint: bool,
}

impl Version {
    /// Create a version with a fresh id and no parent
    pub fn new(
        prompt_id: impl Into<String>,
        content: impl Into<String>,
        branch_name: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: VersionId::generate(),
            prompt_id: prompt_id.into(),
            content: content.into(),
            timestamp,
            commit_message: String::new(),
            author: String::new(),
            parent_id: None,
            branch_name: branch_name.into(),
            tags: BTreeSet::new(),
            is_checkpoint: false,
        }
    }

    /// Set the parent
    pub fn with_parent(mut self, parent_id: Option<VersionId>) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// Set commit message and author
    pub fn with_message(mut self, message: impl Into<String>, author: impl Into<String>) -> Self {
        self.commit_message = message.into();
        self.author = author.into();
        self
    }

    /// Mark as checkpoint
    pub fn with_checkpoint(mut self, is_checkpoint: bool) -> Self {
        self.is_checkpoint = is_checkpoint;
        self
    }

    /// Check if this is the first version of its lineage
    pub fn is_initial(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Check if this version carries the given tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Neither a checkpoint nor tagged
    pub fn is_prunable(&self) -> bool {
        !self.is_checkpoint && self.tags.is_empty()
    }
}

/// Sort versions newest first; equal timestamps fall back to id order
pub fn sort_newest_first(versions: &mut [&Version]) {
    versions.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.id.cmp(&a.id))
    });
}
