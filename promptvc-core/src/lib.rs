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

//! Prompt Version Control
//!
//! Git-like history for prompt texts: every edit is an immutable version,
//! branches are mutable pointers shared by all prompts, and a facade ties
//! them together with retention, diffs and snapshot import/export.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       PromptRepository                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐     ┌─────────────┐     ┌─────────────┐        │
//! │  │   Version   │     │   Branch    │     │  Current    │        │
//! │  │ (immutable) │◄────│  (mutable)  │◄────│   branch    │        │
//! │  └─────────────┘     └─────────────┘     └─────────────┘        │
//! │       │                    │                                     │
//! │       ▼                    ▼                                     │
//! │  ┌─────────────┐     ┌─────────────┐     ┌─────────────┐        │
//! │  │VersionStore │     │  Branch     │     │ Retention   │        │
//! │  │ (id -> ver) │     │  Registry   │     │  Policy     │        │
//! │  └─────────────┘     └─────────────┘     └─────────────┘        │
//! │                                                                  │
//! │  ┌─────────────┐     ┌─────────────────────────────────┐        │
//! │  │ DiffEngine  │     │  Snapshots (JSON export/import) │        │
//! │  │(positional) │     │     validated, all-or-nothing   │        │
//! │  └─────────────┘     └─────────────────────────────────┘        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use promptvc_core::PromptRepository;
//!
//! let mut repo = PromptRepository::new();
//! let v1 = repo.create_version("greeting", "Hello", "first", "ana", false).unwrap();
//! let v2 = repo.create_version("greeting", "Hello there", "warmer", "ana", false).unwrap();
//!
//! assert_eq!(v2.parent_id, Some(v1.id.clone()));
//! assert_eq!(repo.get_version_history("greeting", None).len(), 2);
//! assert_eq!(repo.create_diff(&v1.id, &v2.id).len(), 2);
//! ```

pub mod clock;
pub mod config;
pub mod diff;
pub mod objects;
pub mod refs;
pub mod repository;
pub mod retention;
pub mod shared;
pub mod snapshot;
pub mod store;

pub use clock::{ClockError, VersionClock};
pub use config::{ConfigError, RepositoryConfig};
pub use diff::{DiffEngine, DiffEntry, DiffStats, LineChange};
pub use objects::{Version, VersionId};
pub use refs::{Branch, BranchRegistry, RefError};
pub use repository::{PromptRepository, RepositoryError};
pub use retention::RetentionPolicy;
pub use shared::SharedRepository;
pub use snapshot::{HistoryExport, ImportError, ImportSummary, RepositoryState};
pub use store::{StoreError, VersionStore};
