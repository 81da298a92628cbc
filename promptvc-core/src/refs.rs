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

//! Branch Registry
//!
//! Mutable named pointers to immutable versions. Branch names are global
//! across prompts; a branch is created with an empty head (or a fork point)
//! and becomes active on its first commit. Branches are never deleted.

use super::objects::VersionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Reference errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RefError {
    #[error("Branch not found: {0}")]
    NotFound(String),

    #[error("Branch already exists: {0}")]
    BranchExists(String),

    #[error("Invalid branch name: {0}")]
    InvalidName(String),
}

/// Branch - mutable pointer to the latest version in a lineage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    /// Branch name (global key)
    pub name: String,
    /// Most recent version committed here, or the fork point
    pub head_version_id: Option<VersionId>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Free-text description
    pub description: String,
}

impl Branch {
    /// Create a new branch
    pub fn new(
        name: impl Into<String>,
        head_version_id: Option<VersionId>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            head_version_id,
            created_at: Utc::now(),
            description: description.into(),
        }
    }

    /// Check if the branch points anywhere yet
    pub fn has_head(&self) -> bool {
        self.head_version_id.is_some()
    }
}

/// Branch registry - name -> [`Branch`]
#[derive(Debug, Clone, Default)]
pub struct BranchRegistry {
    branches: HashMap<String, Branch>,
}

impl BranchRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            branches: HashMap::new(),
        }
    }

    /// Create a registry holding one empty default branch
    pub fn with_default_branch(name: &str) -> Self {
        let mut registry = Self::new();
        registry
            .branches
            .insert(name.to_string(), Branch::new(name, None, "Default branch"));
        registry
    }

    /// Register a new branch
    pub fn create(
        &mut self,
        name: &str,
        head_version_id: Option<VersionId>,
        description: &str,
    ) -> Result<Branch, RefError> {
        validate_branch_name(name)?;

        if self.branches.contains_key(name) {
            return Err(RefError::BranchExists(name.to_string()));
        }

        let branch = Branch::new(name, head_version_id, description);
        self.branches.insert(name.to_string(), branch.clone());
        Ok(branch)
    }

    /// Insert or overwrite (import only)
    pub(crate) fn upsert(&mut self, branch: Branch) {
        self.branches.insert(branch.name.clone(), branch);
    }

    /// Get a branch by name
    pub fn get(&self, name: &str) -> Option<&Branch> {
        self.branches.get(name)
    }

    /// Check if a branch exists
    pub fn contains(&self, name: &str) -> bool {
        self.branches.contains_key(name)
    }

    /// Move a branch head
    pub fn set_head(&mut self, name: &str, version_id: VersionId) -> Result<(), RefError> {
        let branch = self
            .branches
            .get_mut(name)
            .ok_or_else(|| RefError::NotFound(name.to_string()))?;

        branch.head_version_id = Some(version_id);
        Ok(())
    }

    /// All branches, sorted by name
    pub fn all(&self) -> Vec<&Branch> {
        let mut branches: Vec<&Branch> = self.branches.values().collect();
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        branches
    }

    /// Check if any branch currently points at this version
    pub fn is_head(&self, version_id: &VersionId) -> bool {
        self.branches
            .values()
            .any(|b| b.head_version_id.as_ref() == Some(version_id))
    }

    /// Number of branches
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

/// Validate a branch name (similar to Git's ref rules)
pub fn validate_branch_name(name: &str) -> Result<(), RefError> {
    if name.is_empty() {
        return Err(RefError::InvalidName("empty name".to_string()));
    }

    if name.starts_with('.') || name.ends_with('.') {
        return Err(RefError::InvalidName(
            "cannot start or end with '.'".to_string(),
        ));
    }

    if name.contains("..") {
        return Err(RefError::InvalidName("cannot contain '..'".to_string()));
    }

    if name.contains("//") {
        return Err(RefError::InvalidName("cannot contain '//'".to_string()));
    }

    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(RefError::InvalidName(
            "cannot contain whitespace or control characters".to_string(),
        ));
    }

    let invalid_chars = ['~', '^', ':', '\\', '?', '*', '['];
    for c in invalid_chars {
        if name.contains(c) {
            return Err(RefError::InvalidName(format!("cannot contain '{}'", c)));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_branch_exists() {
        let registry = BranchRegistry::with_default_branch("main");
        let main = registry.get("main").unwrap();
        assert!(!main.has_head());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_create_and_set_head() {
        let mut registry = BranchRegistry::with_default_branch("main");
        let branch = registry.create("feature", None, "experiments").unwrap();
        assert_eq!(branch.description, "experiments");

        let id = VersionId::new("abc");
        registry.set_head("feature", id.clone()).unwrap();
        assert_eq!(registry.get("feature").unwrap().head_version_id, Some(id.clone()));
        assert!(registry.is_head(&id));
        assert!(!registry.is_head(&VersionId::new("other")));
    }

    #[test]
    fn test_duplicate_branch_rejected() {
        let mut registry = BranchRegistry::with_default_branch("main");
        registry.set_head("main", VersionId::new("head")).unwrap();

        assert_eq!(
            registry.create("main", None, ""),
            Err(RefError::BranchExists("main".to_string()))
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("main").unwrap().head_version_id,
            Some(VersionId::new("head"))
        );
    }

    #[test]
    fn test_set_head_unknown_branch() {
        let mut registry = BranchRegistry::new();
        assert_eq!(
            registry.set_head("nope", VersionId::new("x")),
            Err(RefError::NotFound("nope".to_string()))
        );
    }

    #[test]
    fn test_all_sorted() {
        let mut registry = BranchRegistry::with_default_branch("main");
        registry.create("zeta", None, "").unwrap();
        registry.create("alpha", None, "").unwrap();

        let names: Vec<&str> = registry.all().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "main", "zeta"]);
    }

    #[test]
    fn test_branch_name_validation() {
        // Valid names
        assert!(validate_branch_name("main").is_ok());
        assert!(validate_branch_name("feature/tone").is_ok());
        assert!(validate_branch_name("v1.0.0").is_ok());

        // Invalid names
        assert!(validate_branch_name("").is_err());
        assert!(validate_branch_name(".hidden").is_err());
        assert!(validate_branch_name("bad..name").is_err());
        assert!(validate_branch_name("has space").is_err());
        assert!(validate_branch_name("a//b").is_err());
        assert!(validate_branch_name("what?").is_err());
    }
}
