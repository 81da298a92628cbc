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

//! Prompt Repository - High-Level Version Control Interface
//!
//! The single entry point for prompt history: commits on the checked-out
//! branch, branch/tag/merge/restore operations, diffs, and snapshot
//! import/export. Unknown ids and branches are soft misses (`None`, empty,
//! `false`); only internal failures (an id collision, an exhausted clock)
//! surface as errors.

use super::clock::{ClockError, VersionClock};
use super::config::RepositoryConfig;
use super::diff::{DiffEngine, DiffEntry};
use super::objects::{sort_newest_first, Version};
use super::refs::{Branch, BranchRegistry, RefError};
use super::retention::RetentionPolicy;
use super::snapshot::{
    self, HistoryExport, ImportError, ImportSummary, RepositoryState, ValidatedImport,
    SNAPSHOT_FORMAT_VERSION,
};
use super::store::{StoreError, VersionStore};
use thiserror::Error;

/// Repository errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Reference error: {0}")]
    RefError(#[from] RefError),

    #[error("Clock error: {0}")]
    ClockError(#[from] ClockError),
}

/// Prompt version control repository
#[derive(Debug, Clone)]
pub struct PromptRepository {
    /// Version store
    store: VersionStore,
    /// Branch registry
    refs: BranchRegistry,
    /// Diff engine
    diff_engine: DiffEngine,
    /// Pruning after each commit
    retention: RetentionPolicy,
    /// Creation timestamps
    clock: VersionClock,
    /// Branch new commits go to
    current_branch: String,
    config: RepositoryConfig,
}

impl PromptRepository {
    /// Create an empty repository with default settings
    pub fn new() -> Self {
        Self::with_config(RepositoryConfig::default())
    }

    /// Create an empty repository; the default branch exists and is checked out
    pub fn with_config(config: RepositoryConfig) -> Self {
        Self {
            store: VersionStore::new(),
            refs: BranchRegistry::with_default_branch(&config.default_branch),
            diff_engine: DiffEngine::new(),
            retention: RetentionPolicy::new(config.max_versions_per_prompt),
            clock: VersionClock::new(),
            current_branch: config.default_branch.clone(),
            config,
        }
    }

    // === Core Operations ===

    /// Commit new content for a prompt on the current branch.
    ///
    /// The parent is the prompt's head on the current branch (if any). Runs
    /// retention for the prompt afterwards. Fails only if the generated id is
    /// already taken, or imported history already sits at the last
    /// representable timestamp.
    pub fn create_version(
        &mut self,
        prompt_id: &str,
        content: &str,
        commit_message: &str,
        author: &str,
        is_checkpoint: bool,
    ) -> Result<Version, RepositoryError> {
        let branch = self.current_branch.clone();
        let parent_id = self
            .get_head_version(prompt_id, Some(&branch))
            .map(|v| v.id);

        let version = Version::new(prompt_id, content, branch.as_str(), self.clock.tick()?)
            .with_parent(parent_id)
            .with_message(commit_message, author)
            .with_checkpoint(is_checkpoint);

        self.store.put(version.clone())?;
        self.refs.set_head(&branch, version.id.clone())?;

        tracing::info!(
            prompt_id = %prompt_id,
            version_id = %version.id,
            branch = %branch,
            checkpoint = is_checkpoint,
            "Version created"
        );

        self.retention.apply(prompt_id, &mut self.store, &self.refs);

        Ok(version)
    }

    /// History of a prompt, newest first, optionally for one branch
    pub fn get_version_history(&self, prompt_id: &str, branch: Option<&str>) -> Vec<Version> {
        let mut history = self.store.all_for_prompt(prompt_id, branch);
        sort_newest_first(&mut history);
        history.into_iter().cloned().collect()
    }

    /// Latest version of a prompt on a branch (default branch when `None`).
    ///
    /// Branches are shared by all prompts, so the branch head may belong to a
    /// different prompt; in that case the newest version of this prompt on
    /// the branch is used instead.
    pub fn get_head_version(&self, prompt_id: &str, branch: Option<&str>) -> Option<Version> {
        let branch = branch.unwrap_or(&self.config.default_branch);

        let direct = self
            .refs
            .get(branch)
            .and_then(|b| b.head_version_id.as_ref())
            .and_then(|id| self.store.get(id.as_str()))
            .filter(|v| v.prompt_id == prompt_id);

        match direct {
            Some(version) => Some(version.clone()),
            None => {
                let mut history = self.store.all_for_prompt(prompt_id, Some(branch));
                sort_newest_first(&mut history);
                history.first().map(|v| (*v).clone())
            }
        }
    }

    /// Get a version by id
    pub fn get_version(&self, version_id: impl AsRef<str>) -> Option<&Version> {
        self.store.get(version_id.as_ref())
    }

    /// Re-commit an old version's content as a new version on the current
    /// branch. Nothing is rewound or deleted. `None` if the id is unknown.
    pub fn restore_version(
        &mut self,
        version_id: impl AsRef<str>,
    ) -> Result<Option<Version>, RepositoryError> {
        let Some(target) = self.store.get(version_id.as_ref()).cloned() else {
            tracing::debug!(version_id = %version_id.as_ref(), "Restore of unknown version");
            return Ok(None);
        };

        let message = format!("Restored from version {}", target.id.short());
        let restored =
            self.create_version(&target.prompt_id, &target.content, &message, &target.author, false)?;

        Ok(Some(restored))
    }

    /// Positional line diff, first id as "before". Empty if either id is
    /// unknown.
    pub fn create_diff(
        &self,
        before_id: impl AsRef<str>,
        after_id: impl AsRef<str>,
    ) -> Vec<DiffEntry> {
        match (
            self.store.get(before_id.as_ref()),
            self.store.get(after_id.as_ref()),
        ) {
            (Some(before), Some(after)) => self.diff_engine.diff_text(&before.content, &after.content),
            _ => {
                tracing::debug!(
                    before = %before_id.as_ref(),
                    after = %after_id.as_ref(),
                    "Diff requested for unknown version"
                );
                Vec::new()
            }
        }
    }

    // === Branch Operations ===

    /// Register a new branch pointing at `from_version_id` (or nothing).
    ///
    /// `None` if the name is taken or invalid, or the start version is
    /// unknown. No versions are copied.
    pub fn create_branch(
        &mut self,
        name: &str,
        from_version_id: Option<&str>,
        description: &str,
    ) -> Option<Branch> {
        let head = match from_version_id {
            Some(id) => match self.store.get(id) {
                Some(version) => Some(version.id.clone()),
                None => {
                    tracing::debug!(branch = %name, from = %id, "Branch start version not found");
                    return None;
                }
            },
            None => None,
        };

        match self.refs.create(name, head, description) {
            Ok(branch) => {
                tracing::info!(branch = %name, "Branch created");
                Some(branch)
            }
            Err(e) => {
                tracing::debug!(branch = %name, error = %e, "Branch not created");
                None
            }
        }
    }

    /// Switch the branch new commits go to
    pub fn checkout_branch(&mut self, name: &str) -> bool {
        if !self.refs.contains(name) {
            tracing::debug!(branch = %name, "Checkout of unknown branch");
            return false;
        }

        self.current_branch = name.to_string();
        tracing::info!(branch = %name, "Checked out branch");
        true
    }

    /// Name of the checked-out branch
    pub fn current_branch(&self) -> &str {
        &self.current_branch
    }

    /// All branches, sorted by name
    pub fn get_all_branches(&self) -> Vec<Branch> {
        self.refs.all().into_iter().cloned().collect()
    }

    /// Merge a prompt from `source` into `target`, taking the source content.
    pub fn merge_branch(
        &mut self,
        source: &str,
        target: &str,
        prompt_id: &str,
    ) -> Result<Option<Version>, RepositoryError> {
        self.merge_branch_with(source, target, prompt_id, |source_content, _| {
            source_content.to_string()
        })
    }

    /// Merge with a caller-supplied resolver `(source, target) -> merged`.
    ///
    /// Checks out `target` and commits the merged content there as a
    /// checkpoint. `None` if either branch has no head for the prompt.
    pub fn merge_branch_with<F>(
        &mut self,
        source: &str,
        target: &str,
        prompt_id: &str,
        resolve: F,
    ) -> Result<Option<Version>, RepositoryError>
    where
        F: FnOnce(&str, &str) -> String,
    {
        let source_head = self.get_head_version(prompt_id, Some(source));
        let target_head = self.get_head_version(prompt_id, Some(target));

        let (Some(source_head), Some(target_head)) = (source_head, target_head) else {
            tracing::debug!(
                source = %source,
                target = %target,
                prompt_id = %prompt_id,
                "Merge skipped: missing branch head"
            );
            return Ok(None);
        };

        let merged = resolve(&source_head.content, &target_head.content);

        if !self.checkout_branch(target) {
            return Ok(None);
        }

        let message = format!("Merge {} into {}", source, target);
        let author = self.config.merge_author.clone();
        let version = self.create_version(prompt_id, &merged, &message, &author, true)?;

        tracing::info!(
            source = %source,
            target = %target,
            version_id = %version.id,
            "Branches merged"
        );

        Ok(Some(version))
    }

    // === Tag Operations ===

    /// Add a tag to a version (idempotent). `false` if the version is unknown.
    pub fn tag_version(&mut self, version_id: impl AsRef<str>, tag: &str) -> bool {
        match self.store.add_tag(version_id.as_ref(), tag) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, tag = %tag, "Tag not applied");
                false
            }
        }
    }

    // === Snapshots ===

    /// One prompt's versions (newest first), every branch, and the current
    /// branch
    pub fn export_history(&self, prompt_id: &str) -> HistoryExport {
        HistoryExport {
            format_version: SNAPSHOT_FORMAT_VERSION,
            prompt_id: prompt_id.to_string(),
            versions: self.get_version_history(prompt_id, None),
            branches: self.get_all_branches(),
            current_branch: self.current_branch.clone(),
        }
    }

    /// Import a JSON history document. `false` (with state untouched) if the
    /// document is malformed or inconsistent.
    pub fn import_history(&mut self, data: &str) -> bool {
        match self.try_import_history(data) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "History import rejected");
                false
            }
        }
    }

    /// Import a JSON history document, reporting why it was rejected
    pub fn try_import_history(&mut self, data: &str) -> Result<ImportSummary, ImportError> {
        let export = HistoryExport::from_json(data)?;
        self.import_export(export)
    }

    /// Import an already decoded history document
    pub fn import_export(&mut self, export: HistoryExport) -> Result<ImportSummary, ImportError> {
        let validated = snapshot::validate(
            export.format_version,
            Some(&export.prompt_id),
            export.versions,
            export.branches,
            export.current_branch,
            &self.store,
            &self.refs,
        )?;

        Ok(self.apply_import(validated))
    }

    /// Everything in the repository
    pub fn export_state(&self) -> RepositoryState {
        let mut versions: Vec<&Version> = self.store.iter().collect();
        sort_newest_first(&mut versions);

        RepositoryState {
            format_version: SNAPSHOT_FORMAT_VERSION,
            versions: versions.into_iter().cloned().collect(),
            branches: self.get_all_branches(),
            current_branch: self.current_branch.clone(),
        }
    }

    /// Rebuild a repository from exported state
    pub fn from_state(
        state: RepositoryState,
        config: RepositoryConfig,
    ) -> Result<Self, ImportError> {
        let mut repo = Self::with_config(config);
        let validated = snapshot::validate(
            state.format_version,
            None,
            state.versions,
            state.branches,
            state.current_branch,
            &repo.store,
            &repo.refs,
        )?;

        repo.apply_import(validated);
        Ok(repo)
    }

    fn apply_import(&mut self, validated: ValidatedImport) -> ImportSummary {
        let summary = validated.summary();

        for version in validated.versions {
            self.clock.observe(version.timestamp);
            self.store.upsert(version);
        }
        for branch in validated.branches {
            self.refs.upsert(branch);
        }
        self.current_branch = validated.current_branch;

        tracing::info!(
            versions = summary.versions,
            branches = summary.branches,
            current_branch = %summary.current_branch,
            "Snapshot imported"
        );

        summary
    }

    // === Helper Methods ===

    /// Prompts with at least one stored version
    pub fn prompt_ids(&self) -> Vec<String> {
        self.store
            .prompt_ids()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Total stored versions across all prompts
    pub fn version_count(&self) -> usize {
        self.store.len()
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }
}

impl Default for PromptRepository {
    fn default() -> Self {
        Self::new()
    }
}
