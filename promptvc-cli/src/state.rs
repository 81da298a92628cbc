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

//! On-disk state for the CLI
//!
//! `<dir>/state.bin` holds a bincode-encoded [`RepositoryState`];
//! `<dir>/promptvc.toml` optionally overrides [`RepositoryConfig`].

use anyhow::{Context, Result};
use promptvc_core::{PromptRepository, RepositoryConfig, RepositoryState};
use std::fs;
use std::path::{Path, PathBuf};

const STATE_FILE: &str = "state.bin";
const CONFIG_FILE: &str = "promptvc.toml";

/// State directory handle
#[derive(Debug, Clone)]
pub struct StateDir {
    root: PathBuf,
}

impl StateDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn state_path(&self) -> PathBuf {
        self.root.join(STATE_FILE)
    }

    fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn exists(&self) -> bool {
        self.state_path().exists()
    }

    /// Read `promptvc.toml`, falling back to defaults when absent
    pub fn load_config(&self) -> Result<RepositoryConfig> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(RepositoryConfig::default());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        RepositoryConfig::from_toml_str(&raw)
            .with_context(|| format!("Invalid config {:?}", path))
    }

    /// Load the repository, or an empty one if nothing was saved yet
    pub fn load(&self) -> Result<PromptRepository> {
        let config = self.load_config()?;
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!(path = ?path, "No saved state, starting empty");
            return Ok(PromptRepository::with_config(config));
        }

        let bytes = fs::read(&path).with_context(|| format!("Failed to read {:?}", path))?;
        let state: RepositoryState =
            bincode::deserialize(&bytes).context("Failed to decode repository state")?;
        let repo = PromptRepository::from_state(state, config)
            .context("Saved repository state is inconsistent")?;

        tracing::debug!(path = ?path, versions = repo.version_count(), "Loaded state");
        Ok(repo)
    }

    /// Write the repository atomically (temp file + rename)
    pub fn save(&self, repo: &PromptRepository) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create {:?}", self.root))?;

        let bytes = bincode::serialize(&repo.export_state())
            .context("Failed to encode repository state")?;

        let path = self.state_path();
        let tmp = path.with_extension("bin.tmp");
        fs::write(&tmp, &bytes).with_context(|| format!("Failed to write {:?}", tmp))?;
        fs::rename(&tmp, &path).with_context(|| format!("Failed to replace {:?}", path))?;

        tracing::debug!(path = ?path, bytes = bytes.len(), "Saved state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_state_starts_empty() {
        let dir = TempDir::new().unwrap();
        let state = StateDir::new(dir.path().join("repo"));

        assert!(!state.exists());
        let repo = state.load().unwrap();
        assert_eq!(repo.version_count(), 0);
        assert_eq!(repo.current_branch(), "main");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let state = StateDir::new(dir.path());

        let mut repo = PromptRepository::new();
        let v1 = repo
            .create_version("greeting", "Hello", "first", "ana", false)
            .unwrap();
        repo.create_branch("tone", Some(v1.id.as_str()), "friendlier");
        repo.checkout_branch("tone");
        repo.tag_version(&v1.id, "baseline");
        state.save(&repo).unwrap();

        let reloaded = state.load().unwrap();
        assert_eq!(reloaded.current_branch(), "tone");
        assert_eq!(reloaded.get_all_branches(), repo.get_all_branches());
        assert_eq!(
            reloaded.get_version_history("greeting", None),
            repo.get_version_history("greeting", None)
        );
    }

    #[test]
    fn test_config_file_applies() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "max_versions_per_prompt = 2\ndefault_branch = \"trunk\"\n",
        )
        .unwrap();

        let repo = StateDir::new(dir.path()).load().unwrap();
        assert_eq!(repo.config().max_versions_per_prompt, 2);
        assert_eq!(repo.current_branch(), "trunk");
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "max_versions_per_prompt = 0\n").unwrap();

        assert!(StateDir::new(dir.path()).load().is_err());
    }
}
