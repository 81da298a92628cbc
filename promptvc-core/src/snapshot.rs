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

//! History snapshots
//!
//! Export/import documents for prompt history. A [`HistoryExport`] carries one
//! prompt's versions plus every branch (branches are global); a
//! [`RepositoryState`] carries everything. Both are validated in full against
//! the target repository before anything is written, so a rejected import
//! leaves the repository untouched.

use super::objects::{Version, VersionId};
use super::refs::{validate_branch_name, Branch, BranchRegistry};
use super::store::VersionStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Snapshot schema version
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Import errors
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unsupported snapshot format version {0} (expected {})", SNAPSHOT_FORMAT_VERSION)]
    UnsupportedFormat(u32),

    #[error("Version with empty id")]
    EmptyId,

    #[error("Version {id} belongs to prompt '{found}', expected '{expected}'")]
    PromptMismatch {
        id: VersionId,
        expected: String,
        found: String,
    },

    #[error("Version {id} references missing parent {parent}")]
    DanglingParent { id: VersionId, parent: VersionId },

    #[error("Version {id} references parent {parent} from another prompt")]
    ForeignParent { id: VersionId, parent: VersionId },

    #[error("Invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("Current branch '{0}' does not exist")]
    UnknownCurrentBranch(String),
}

/// One prompt's history, as produced by `export_history`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryExport {
    pub format_version: u32,
    pub prompt_id: String,
    /// Versions of `prompt_id`, newest first
    pub versions: Vec<Version>,
    /// All branches, not filtered by prompt
    pub branches: Vec<Branch>,
    pub current_branch: String,
}

impl HistoryExport {
    /// Serialize as pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON (shape only; semantic checks happen on import)
    pub fn from_json(data: &str) -> Result<Self, ImportError> {
        Ok(serde_json::from_str(data)?)
    }
}

/// Whole-repository state for callers that persist the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryState {
    pub format_version: u32,
    pub versions: Vec<Version>,
    pub branches: Vec<Branch>,
    pub current_branch: String,
}

impl RepositoryState {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(data: &str) -> Result<Self, ImportError> {
        Ok(serde_json::from_str(data)?)
    }
}

/// Outcome of a successful import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub versions: usize,
    pub branches: usize,
    pub current_branch: String,
}

/// A snapshot that passed validation and can be applied without failure
#[derive(Debug)]
pub(crate) struct ValidatedImport {
    pub versions: Vec<Version>,
    pub branches: Vec<Branch>,
    pub current_branch: String,
}

impl ValidatedImport {
    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            versions: self.versions.len(),
            branches: self.branches.len(),
            current_branch: self.current_branch.clone(),
        }
    }
}

/// Check a snapshot against the repository it will be merged into.
///
/// Later entries with the same id/name replace earlier ones. `prompt_id`
/// restricts every version to one prompt (history imports).
pub(crate) fn validate(
    format_version: u32,
    prompt_id: Option<&str>,
    versions: Vec<Version>,
    branches: Vec<Branch>,
    current_branch: String,
    store: &VersionStore,
    refs: &BranchRegistry,
) -> Result<ValidatedImport, ImportError> {
    if format_version != SNAPSHOT_FORMAT_VERSION {
        return Err(ImportError::UnsupportedFormat(format_version));
    }

    let mut incoming: HashMap<VersionId, Version> = HashMap::with_capacity(versions.len());
    for version in versions {
        if version.id.is_empty() {
            return Err(ImportError::EmptyId);
        }

        if let Some(expected) = prompt_id {
            if version.prompt_id != expected {
                return Err(ImportError::PromptMismatch {
                    id: version.id,
                    expected: expected.to_string(),
                    found: version.prompt_id,
                });
            }
        }

        // Overwriting an existing id must not move it to another prompt
        if let Some(existing) = store.get(version.id.as_str()) {
            if existing.prompt_id != version.prompt_id {
                return Err(ImportError::PromptMismatch {
                    id: version.id,
                    expected: existing.prompt_id.clone(),
                    found: version.prompt_id,
                });
            }
        }

        incoming.insert(version.id.clone(), version);
    }

    for version in incoming.values() {
        let Some(parent_id) = &version.parent_id else {
            continue;
        };

        let parent = incoming
            .get(parent_id)
            .or_else(|| store.get(parent_id.as_str()))
            .ok_or_else(|| ImportError::DanglingParent {
                id: version.id.clone(),
                parent: parent_id.clone(),
            })?;

        if parent.prompt_id != version.prompt_id {
            return Err(ImportError::ForeignParent {
                id: version.id.clone(),
                parent: parent_id.clone(),
            });
        }
    }

    let mut incoming_branches: HashMap<String, Branch> = HashMap::with_capacity(branches.len());
    for branch in branches {
        validate_branch_name(&branch.name)
            .map_err(|_| ImportError::InvalidBranchName(branch.name.clone()))?;
        incoming_branches.insert(branch.name.clone(), branch);
    }

    if !incoming_branches.contains_key(&current_branch) && !refs.contains(&current_branch) {
        return Err(ImportError::UnknownCurrentBranch(current_branch));
    }

    Ok(ValidatedImport {
        versions: incoming.into_values().collect(),
        branches: incoming_branches.into_values().collect(),
        current_branch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn version(prompt: &str, parent: Option<&Version>) -> Version {
        Version::new(prompt, "text", "main", Utc::now()).with_parent(parent.map(|p| p.id.clone()))
    }

    fn run(
        prompt_id: Option<&str>,
        versions: Vec<Version>,
        branches: Vec<Branch>,
        current: &str,
        store: &VersionStore,
    ) -> Result<ValidatedImport, ImportError> {
        let refs = BranchRegistry::with_default_branch("main");
        validate(
            SNAPSHOT_FORMAT_VERSION,
            prompt_id,
            versions,
            branches,
            current.to_string(),
            store,
            &refs,
        )
    }

    #[test]
    fn test_valid_chain() {
        let root = version("p", None);
        let child = version("p", Some(&root));
        let result = run(Some("p"), vec![child, root], vec![], "main", &VersionStore::new()).unwrap();
        assert_eq!(result.summary().versions, 2);
    }

    #[test]
    fn test_later_duplicates_win() {
        let first = version("p", None);
        let mut second = first.clone();
        second.content = "replacement".to_string();

        let result = run(Some("p"), vec![first, second], vec![], "main", &VersionStore::new()).unwrap();
        assert_eq!(result.versions.len(), 1);
        assert_eq!(result.versions[0].content, "replacement");
    }

    #[test]
    fn test_parent_in_existing_store() {
        let mut store = VersionStore::new();
        let root = version("p", None);
        let child = version("p", Some(&root));
        store.put(root).unwrap();

        assert!(run(Some("p"), vec![child], vec![], "main", &store).is_ok());
    }

    #[test]
    fn test_rejections() {
        let store = VersionStore::new();
        let root = version("p", None);

        let foreign = version("q", None);
        assert!(matches!(
            run(Some("p"), vec![foreign.clone()], vec![], "main", &store),
            Err(ImportError::PromptMismatch { .. })
        ));

        let orphan = version("p", Some(&root));
        assert!(matches!(
            run(Some("p"), vec![orphan], vec![], "main", &store),
            Err(ImportError::DanglingParent { .. })
        ));

        let cross = version("p", Some(&foreign));
        assert!(matches!(
            run(None, vec![foreign.clone(), cross], vec![], "main", &store),
            Err(ImportError::ForeignParent { .. })
        ));

        let mut blank = root.clone();
        blank.id = VersionId::new("");
        assert!(matches!(
            run(Some("p"), vec![blank], vec![], "main", &store),
            Err(ImportError::EmptyId)
        ));

        let bad_branch = Branch::new("bad..name", None, "");
        assert!(matches!(
            run(Some("p"), vec![], vec![bad_branch], "main", &store),
            Err(ImportError::InvalidBranchName(_))
        ));

        assert!(matches!(
            run(Some("p"), vec![], vec![], "nowhere", &store),
            Err(ImportError::UnknownCurrentBranch(_))
        ));
    }

    #[test]
    fn test_existing_id_cannot_change_prompt() {
        let mut store = VersionStore::new();
        let existing = version("p", None);
        store.put(existing.clone()).unwrap();

        let mut moved = existing.clone();
        moved.prompt_id = "q".to_string();

        let result = run(None, vec![moved], vec![], "main", &store);
        match result {
            Err(ImportError::PromptMismatch {
                id,
                expected,
                found,
            }) => {
                assert_eq!(id, existing.id);
                assert_eq!(expected, "p");
                assert_eq!(found, "q");
            }
            other => panic!("expected prompt mismatch, got {:?}", other),
        }

        // Same id, same prompt is an accepted overwrite
        let mut edited = existing.clone();
        edited.content = "edited".to_string();
        assert!(run(None, vec![edited], vec![], "main", &store).is_ok());
    }

    #[test]
    fn test_current_branch_from_snapshot() {
        let feature = Branch::new("feature", None, "");
        let result = run(None, vec![], vec![feature], "feature", &VersionStore::new()).unwrap();
        assert_eq!(result.current_branch, "feature");
    }

    #[test]
    fn test_unsupported_format() {
        let refs = BranchRegistry::with_default_branch("main");
        let result = validate(
            99,
            None,
            vec![],
            vec![],
            "main".to_string(),
            &VersionStore::new(),
            &refs,
        );
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(99))));
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let json = r#"{"formatVersion":1,"promptId":"p","versions":[{"id":"x"}],"branches":[],"currentBranch":"main"}"#;
        assert!(matches!(
            HistoryExport::from_json(json),
            Err(ImportError::Malformed(_))
        ));
        assert!(matches!(
            HistoryExport::from_json("not json"),
            Err(ImportError::Malformed(_))
        ));
    }
}
