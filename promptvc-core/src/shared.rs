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

//! Thread-safe handle around a [`PromptRepository`].
//!
//! The repository itself is single-owner; commits touch the store, the
//! branch registry and the clock together, so one lock guards all of it.

use super::repository::PromptRepository;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Cloneable, lock-guarded repository
#[derive(Clone, Default)]
pub struct SharedRepository {
    inner: Arc<Mutex<PromptRepository>>,
}

impl SharedRepository {
    pub fn new(repository: PromptRepository) -> Self {
        Self {
            inner: Arc::new(Mutex::new(repository)),
        }
    }

    /// Lock for a sequence of operations
    pub fn lock(&self) -> MutexGuard<'_, PromptRepository> {
        self.inner.lock()
    }

    /// Run one closure under the lock
    pub fn with<R>(&self, f: impl FnOnce(&mut PromptRepository) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }
}

impl std::fmt::Debug for SharedRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRepository").finish_non_exhaustive()
    }
}
