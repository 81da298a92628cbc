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

//! Configuration for repository behavior
//!
//! Controls the retention cap, the branch a fresh repository starts on, and
//! the author recorded on merge commits. Can be built in code or parsed from
//! a TOML document where every key is optional.

use crate::refs::validate_branch_name;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default maximum number of versions kept per prompt before pruning
pub const DEFAULT_MAX_VERSIONS_PER_PROMPT: usize = 50;

/// Branch every repository starts with
pub const DEFAULT_BRANCH: &str = "main";

/// Author recorded on merge commits
pub const DEFAULT_MERGE_AUTHOR: &str = "System";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Repository configuration
///
/// - Production: use defaults (50 versions per prompt)
/// - Archival: [`RepositoryConfig::unbounded`] disables pruning entirely
/// - Testing: [`RepositoryConfig::with_max_versions`] with a small cap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Soft cap on versions per prompt. Checkpoints, tagged versions and
    /// branch heads are kept even when the cap is exceeded.
    pub max_versions_per_prompt: usize,

    /// Branch created at initialization and checked out by default
    pub default_branch: String,

    /// Author written on merge commits
    pub merge_author: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            max_versions_per_prompt: DEFAULT_MAX_VERSIONS_PER_PROMPT,
            default_branch: DEFAULT_BRANCH.to_string(),
            merge_author: DEFAULT_MERGE_AUTHOR.to_string(),
        }
    }
}

impl RepositoryConfig {
    /// Create a config that never prunes
    pub fn unbounded() -> Self {
        Self {
            max_versions_per_prompt: usize::MAX,
            ..Self::default()
        }
    }

    /// Create a config with a custom retention cap
    pub fn with_max_versions(max_versions_per_prompt: usize) -> Self {
        Self {
            max_versions_per_prompt,
            ..Self::default()
        }
    }

    /// Parse and validate a TOML document
    ///
    /// ```toml
    /// max_versions_per_prompt = 20
    /// default_branch = "main"
    /// merge_author = "System"
    /// ```
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the config describes a usable repository
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_versions_per_prompt == 0 {
            return Err(ConfigError::Invalid(
                "max_versions_per_prompt must be at least 1".to_string(),
            ));
        }

        validate_branch_name(&self.default_branch)
            .map_err(|e| ConfigError::Invalid(format!("default_branch: {}", e)))?;

        Ok(())
    }
}
