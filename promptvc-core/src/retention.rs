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

//! Retention policy for prompt history.
//!
//! Bounds the number of versions kept per prompt. Once a prompt's history
//! (across all branches) exceeds the cap, the oldest prunable versions are
//! removed until only `max_versions_per_prompt` prunable ones remain.
//! Exempt versions are never removed and never displace a prunable one:
//!
//! - checkpoints,
//! - tagged versions,
//! - heads of any branch.
//!
//! The cap is therefore a soft bound on the total. Children of a pruned
//! version are re-linked to its parent, which keeps every surviving
//! `parent_id` resolvable.

use super::objects::{sort_newest_first, Version, VersionId};
use super::refs::BranchRegistry;
use super::store::VersionStore;

/// Per-prompt retention cap
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_versions_per_prompt: usize,
}

impl RetentionPolicy {
    pub fn new(max_versions_per_prompt: usize) -> Self {
        Self {
            max_versions_per_prompt,
        }
    }

    /// Never prune
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    pub fn max_versions_per_prompt(&self) -> usize {
        self.max_versions_per_prompt
    }

    /// Pick the ids to prune from a newest-first history.
    ///
    /// `is_protected` marks versions that must survive for reasons outside
    /// the version itself (branch heads). They still occupy one of the
    /// kept slots when they fall among the newest.
    pub fn select<F>(&self, history: &[&Version], is_protected: F) -> Vec<VersionId>
    where
        F: Fn(&Version) -> bool,
    {
        if history.len() <= self.max_versions_per_prompt {
            return Vec::new();
        }

        let mut doomed: Vec<VersionId> = history
            .iter()
            .copied()
            .filter(|v| v.is_prunable())
            .skip(self.max_versions_per_prompt)
            .filter(|v| !is_protected(*v))
            .map(|v| v.id.clone())
            .collect();

        // Oldest first
        doomed.reverse();
        doomed
    }

    /// Prune one prompt's history in place. Returns the removed versions,
    /// oldest first.
    pub fn apply(
        &self,
        prompt_id: &str,
        store: &mut VersionStore,
        refs: &BranchRegistry,
    ) -> Vec<Version> {
        let doomed = {
            let mut history = store.all_for_prompt(prompt_id, None);
            sort_newest_first(&mut history);
            self.select(&history, |v| refs.is_head(&v.id))
        };

        let mut removed = Vec::with_capacity(doomed.len());
        for id in doomed {
            if let Some(version) = store.remove(id.as_str()) {
                store.reparent_children(&version.id, version.parent_id.as_ref());
                removed.push(version);
            }
        }

        if !removed.is_empty() {
            tracing::debug!(
                prompt_id = %prompt_id,
                pruned = removed.len(),
                max_versions = self.max_versions_per_prompt,
                "Retention pruned prompt history"
            );
        }

        removed
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_VERSIONS_PER_PROMPT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    /// Linear chain of `n` versions on main, oldest first
    fn chain(store: &mut VersionStore, prompt: &str, n: usize) -> Vec<VersionId> {
        let base = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        let mut ids: Vec<VersionId> = Vec::new();
        for i in 0..n {
            let version = Version::new(prompt, format!("v{}", i + 1), "main", base + Duration::seconds(i as i64))
                .with_parent(ids.last().cloned());
            ids.push(version.id.clone());
            store.put(version).unwrap();
        }
        ids
    }

    #[test]
    fn test_under_cap_keeps_everything() {
        let mut store = VersionStore::new();
        chain(&mut store, "p", 3);
        let refs = BranchRegistry::with_default_branch("main");

        let removed = RetentionPolicy::new(3).apply("p", &mut store, &refs);
        assert!(removed.is_empty());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_prunes_oldest_and_relinks() {
        let mut store = VersionStore::new();
        let ids = chain(&mut store, "p", 5);
        let refs = BranchRegistry::with_default_branch("main");

        let removed = RetentionPolicy::new(2).apply("p", &mut store, &refs);

        let removed_ids: Vec<&VersionId> = removed.iter().map(|v| &v.id).collect();
        assert_eq!(removed_ids, vec![&ids[0], &ids[1], &ids[2]]);
        assert_eq!(store.len(), 2);

        // Survivor's parent was pruned; it becomes the new lineage root
        assert_eq!(store.get(ids[3].as_str()).unwrap().parent_id, None);
        assert_eq!(
            store.get(ids[4].as_str()).unwrap().parent_id,
            Some(ids[3].clone())
        );
    }

    #[test]
    fn test_exempt_versions_survive() {
        let mut store = VersionStore::new();
        let ids = chain(&mut store, "p", 6);
        store.add_tag(ids[0].as_str(), "baseline").unwrap();

        let mut refs = BranchRegistry::with_default_branch("main");
        refs.create("frozen", Some(ids[1].clone()), "").unwrap();

        let removed = RetentionPolicy::new(3).apply("p", &mut store, &refs);

        // Tagged ids[0] and head ids[1] are kept on top of the 3 newest
        let removed_ids: Vec<&VersionId> = removed.iter().map(|v| &v.id).collect();
        assert_eq!(removed_ids, vec![&ids[2]]);
        assert_eq!(store.len(), 5);
        assert!(store.contains(ids[0].as_str()));
        assert!(store.contains(ids[1].as_str()));
        assert_eq!(
            store.get(ids[3].as_str()).unwrap().parent_id,
            Some(ids[1].clone())
        );
    }

    #[test]
    fn test_other_prompts_untouched() {
        let mut store = VersionStore::new();
        chain(&mut store, "p", 4);
        chain(&mut store, "q", 4);
        let refs = BranchRegistry::with_default_branch("main");

        RetentionPolicy::new(1).apply("p", &mut store, &refs);
        assert_eq!(store.all_for_prompt("p", None).len(), 1);
        assert_eq!(store.all_for_prompt("q", None).len(), 4);
    }

    #[test]
    fn test_select_soft_cap() {
        let base = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        let versions: Vec<Version> = (0..4)
            .map(|i| {
                Version::new("p", "c", "main", base + Duration::seconds(i)).with_checkpoint(true)
            })
            .collect();
        let mut history: Vec<&Version> = versions.iter().collect();
        sort_newest_first(&mut history);

        assert!(RetentionPolicy::new(1).select(&history, |_| false).is_empty());
        assert!(RetentionPolicy::unbounded().select(&history, |_| false).is_empty());
    }

    #[test]
    fn test_checkpoints_do_not_displace_plain_versions() {
        let base = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        // Checkpoints at the newest end: the 2 newest plain versions still stay
        let versions: Vec<Version> = (0..7)
            .map(|i| {
                Version::new("p", "c", "main", base + Duration::seconds(i)).with_checkpoint(i >= 4)
            })
            .collect();
        let mut history: Vec<&Version> = versions.iter().collect();
        sort_newest_first(&mut history);

        let doomed = RetentionPolicy::new(2).select(&history, |_| false);
        assert_eq!(doomed, vec![versions[0].id.clone(), versions[1].id.clone()]);
    }

    proptest! {
        #[test]
        fn prop_keeps_cap_plus_exempt(flags in proptest::collection::vec(any::<bool>(), 0..40), cap in 1usize..8) {
            let base = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
            let versions: Vec<Version> = flags
                .iter()
                .enumerate()
                .map(|(i, checkpoint)| {
                    Version::new("p", "c", "main", base + Duration::seconds(i as i64))
                        .with_checkpoint(*checkpoint)
                })
                .collect();
            let mut history: Vec<&Version> = versions.iter().collect();
            sort_newest_first(&mut history);

            let doomed = RetentionPolicy::new(cap).select(&history, |_| false);
            let exempt = flags.iter().filter(|c| **c).count();
            let plain = flags.len() - exempt;

            prop_assert_eq!(doomed.len(), plain.saturating_sub(cap));
            for id in &doomed {
                let version = versions.iter().find(|v| &v.id == id).unwrap();
                prop_assert!(version.is_prunable());
            }
        }
    }
}
