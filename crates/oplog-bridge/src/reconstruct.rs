// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Structural recovery of a log's head set.
//!
//! Heads are the entries no other entry names as a successor. Given every
//! entry of a log, that is exactly the log's frontier; no bookkeeping beyond
//! the entries themselves is needed. With entries missing, an entry whose
//! only referrer is missing surfaces as a head too, so a partial set yields
//! a superset of the true heads.

use std::collections::{BTreeMap, BTreeSet};

use oplog_block::{classify_bytes, BlockCategory, Classified, EntryView};
use oplog_cid::LocalCid;

use crate::report::CategoryCounts;

/// Heads of the graph given as `(entry, successors)` pairs, sorted.
pub fn compute_heads<'a, I>(entries: I) -> Vec<LocalCid>
where
    I: IntoIterator<Item = (LocalCid, &'a [LocalCid])>,
{
    let mut all = BTreeSet::new();
    let mut named = BTreeSet::new();
    for (cid, next) in entries {
        all.insert(cid);
        named.extend(next.iter().copied());
    }
    all.difference(&named).copied().collect()
}

/// Classification state for one reconstruction pass.
///
/// Owned by a single restore invocation and dropped with it.
#[derive(Debug, Default)]
pub struct ReconstructionSession {
    categories: BTreeMap<LocalCid, BlockCategory>,
    entries: BTreeMap<LocalCid, EntryView>,
    roots: BTreeSet<LocalCid>,
}

impl ReconstructionSession {
    /// Fresh session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode, classify and record one block.
    pub fn observe(&mut self, cid: LocalCid, bytes: &[u8]) -> BlockCategory {
        self.observe_classified(cid, classify_bytes(bytes))
    }

    /// Record an already classified block. A CID seen before keeps its
    /// first classification.
    pub fn observe_classified(&mut self, cid: LocalCid, classified: Classified) -> BlockCategory {
        if let Some(category) = self.categories.get(&cid) {
            return *category;
        }
        let category = classified.category();
        self.categories.insert(cid, category);
        match classified {
            Classified::RootDescriptor(_) => {
                self.roots.insert(cid);
            }
            Classified::LogEntry(view) => {
                self.entries.insert(cid, view);
            }
            Classified::SignerDescriptor(_)
            | Classified::PermissionDescriptor(_)
            | Classified::Unrecognized => {}
        }
        category
    }

    /// Category recorded for `cid`.
    pub fn category_of(&self, cid: &LocalCid) -> Option<BlockCategory> {
        self.categories.get(cid).copied()
    }

    /// Blocks seen per category.
    pub fn category_counts(&self) -> CategoryCounts {
        let mut counts = CategoryCounts::new();
        for category in self.categories.values() {
            *counts.entry(*category).or_default() += 1;
        }
        counts
    }

    /// Root descriptors seen, sorted.
    pub fn root_descriptors(&self) -> Vec<LocalCid> {
        self.roots.iter().copied().collect()
    }

    /// Number of log entries seen.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Entries never named as a successor, sorted.
    pub fn heads(&self) -> Vec<LocalCid> {
        compute_heads(
            self.entries
                .iter()
                .map(|(cid, view)| (*cid, view.next.as_slice())),
        )
    }

    /// Heads over the entries of `log_id` that `present` admits. Entries
    /// carrying no log id are kept. An entry left out does not hide its
    /// predecessors, so they surface as heads in its place.
    pub fn heads_for_log<P>(&self, log_id: &str, present: P) -> Vec<LocalCid>
    where
        P: Fn(&LocalCid) -> bool,
    {
        compute_heads(
            self.entries
                .iter()
                .filter(|(cid, view)| {
                    present(cid) && view.log_id.as_deref().is_none_or(|id| id == log_id)
                })
                .map(|(cid, view)| (*cid, view.next.as_slice())),
        )
    }
}
