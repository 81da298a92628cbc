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

//! Version Store
//!
//! Append-only map of version id -> [`Version`]. Removal is reserved for the
//! retention policy; the only in-place edit is adding a tag.

use super::objects::{Version, VersionId};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Store errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Version id already in use: {0}")]
    DuplicateId(VersionId),

    #[error("Version not found: {0}")]
    NotFound(String),
}

/// In-memory version store
#[derive(Debug, Clone, Default)]
pub struct VersionStore {
    /// VersionId -> Version
    versions: HashMap<VersionId, Version>,
}

impl VersionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            versions: HashMap::new(),
        }
    }

    /// Insert a new version; an existing id is an error
    pub fn put(&mut self, version: Version) -> Result<(), StoreError> {
        if self.versions.contains_key(&version.id) {
            return Err(StoreError::DuplicateId(version.id));
        }

        self.versions.insert(version.id.clone(), version);
        Ok(())
    }

    /// Insert or overwrite (import only)
    pub(crate) fn upsert(&mut self, version: Version) {
        self.versions.insert(version.id.clone(), version);
    }

    /// Get a version by id
    pub fn get(&self, id: &str) -> Option<&Version> {
        self.versions.get(id)
    }

    /// Check if a version exists
    pub fn contains(&self, id: &str) -> bool {
        self.versions.contains_key(id)
    }

    /// All versions of a prompt, optionally restricted to one branch.
    /// Unordered; callers sort.
    pub fn all_for_prompt(&self, prompt_id: &str, branch: Option<&str>) -> Vec<&Version> {
        self.versions
            .values()
            .filter(|v| v.prompt_id == prompt_id)
            .filter(|v| branch.map_or(true, |b| v.branch_name == b))
            .collect()
    }

    /// Remove a version (retention only)
    pub fn remove(&mut self, id: &str) -> Option<Version> {
        self.versions.remove(id)
    }

    /// Add a tag. Returns whether the tag was newly added.
    pub fn add_tag(&mut self, id: &str, tag: &str) -> Result<bool, StoreError> {
        let version = self
            .versions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        Ok(version.tags.insert(tag.to_string()))
    }

    /// Point every child of `old_parent` at `new_parent` instead.
    /// Returns the number of versions re-linked.
    pub(crate) fn reparent_children(
        &mut self,
        old_parent: &VersionId,
        new_parent: Option<&VersionId>,
    ) -> usize {
        let mut relinked = 0;
        for version in self.versions.values_mut() {
            if version.parent_id.as_ref() == Some(old_parent) {
                version.parent_id = new_parent.cloned();
                relinked += 1;
            }
        }
        relinked
    }

    /// Distinct prompt ids, sorted
    pub fn prompt_ids(&self) -> Vec<&str> {
        self.versions
            .values()
            .map(|v| v.prompt_id.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Iterate over all versions
    pub fn iter(&self) -> impl Iterator<Item = &Version> {
        self.versions.values()
    }

    /// Number of stored versions
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn version(prompt: &str, branch: &str) -> Version {
        Version::new(prompt, "content", branch, Utc::now())
    }

    #[test]
    fn test_put_and_get() {
        let mut store = VersionStore::new();
        let v = version("greeting", "main");
        let id = v.id.clone();

        store.put(v).unwrap();
        assert!(store.contains(id.as_str()));
        assert_eq!(store.get(id.as_str()).unwrap().prompt_id, "greeting");
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut store = VersionStore::new();
        let v = version("greeting", "main");
        let dup = v.clone();

        store.put(v).unwrap();
        assert_eq!(
            store.put(dup.clone()),
            Err(StoreError::DuplicateId(dup.id))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_all_for_prompt_filters() {
        let mut store = VersionStore::new();
        store.put(version("a", "main")).unwrap();
        store.put(version("a", "main")).unwrap();
        store.put(version("a", "feature")).unwrap();
        store.put(version("b", "main")).unwrap();

        assert_eq!(store.all_for_prompt("a", None).len(), 3);
        assert_eq!(store.all_for_prompt("a", Some("main")).len(), 2);
        assert_eq!(store.all_for_prompt("a", Some("feature")).len(), 1);
        assert_eq!(store.all_for_prompt("b", Some("feature")).len(), 0);
        assert!(store.all_for_prompt("c", None).is_empty());
    }

    #[test]
    fn test_add_tag_idempotent() {
        let mut store = VersionStore::new();
        let v = version("a", "main");
        let id = v.id.clone();
        store.put(v).unwrap();

        assert_eq!(store.add_tag(id.as_str(), "release"), Ok(true));
        assert_eq!(store.add_tag(id.as_str(), "release"), Ok(false));
        assert_eq!(store.get(id.as_str()).unwrap().tags.len(), 1);
        assert!(matches!(
            store.add_tag("missing", "release"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_remove_and_reparent() {
        let mut store = VersionStore::new();
        let root = version("a", "main");
        let middle = version("a", "main").with_parent(Some(root.id.clone()));
        let leaf = version("a", "main").with_parent(Some(middle.id.clone()));
        let (root_id, middle_id, leaf_id) = (root.id.clone(), middle.id.clone(), leaf.id.clone());

        store.put(root).unwrap();
        store.put(middle).unwrap();
        store.put(leaf).unwrap();

        let removed = store.remove(middle_id.as_str()).unwrap();
        let relinked = store.reparent_children(&removed.id, removed.parent_id.as_ref());

        assert_eq!(relinked, 1);
        assert_eq!(
            store.get(leaf_id.as_str()).unwrap().parent_id,
            Some(root_id)
        );
    }

    #[test]
    fn test_prompt_ids_sorted_distinct() {
        let mut store = VersionStore::new();
        store.put(version("zeta", "main")).unwrap();
        store.put(version("alpha", "main")).unwrap();
        store.put(version("zeta", "feature")).unwrap();

        assert_eq!(store.prompt_ids(), vec!["alpha", "zeta"]);
    }
}
