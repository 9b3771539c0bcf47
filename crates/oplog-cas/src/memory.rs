// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory content-addressed block store.

use std::collections::BTreeMap;
use std::sync::Arc;

use oplog_cid::{local_cid_of, LocalCid};

use crate::{BlockStore, CasError};

/// In-memory block store.
///
/// Stores blocks in a `BTreeMap<LocalCid, Arc<[u8]>>` so listing is sorted
/// for free. Duplicate puts are no-ops and do not inflate
/// [`byte_count`](MemoryTier::byte_count).
#[derive(Default)]
pub struct MemoryTier {
    blocks: BTreeMap<LocalCid, Arc<[u8]>>,
    byte_count: usize,
}

impl MemoryTier {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks currently stored.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if no blocks are stored.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total bytes stored across all blocks.
    pub fn byte_count(&self) -> usize {
        self.byte_count
    }

    /// Drop a block. Returns `true` if it was present.
    pub fn remove(&mut self, cid: &LocalCid) -> bool {
        match self.blocks.remove(cid) {
            Some(bytes) => {
                self.byte_count -= bytes.len();
                true
            }
            None => false,
        }
    }

    fn insert(&mut self, cid: LocalCid, bytes: &[u8]) {
        if self.blocks.contains_key(&cid) {
            return;
        }
        self.byte_count += bytes.len();
        self.blocks.insert(cid, Arc::from(bytes));
    }
}

impl BlockStore for MemoryTier {
    fn put(&mut self, bytes: &[u8]) -> Result<LocalCid, CasError> {
        let cid = local_cid_of(bytes)?;
        self.insert(cid, bytes);
        Ok(cid)
    }

    fn put_verified(&mut self, expected: LocalCid, bytes: &[u8]) -> Result<(), CasError> {
        let computed = local_cid_of(bytes)?;
        if computed != expected {
            return Err(CasError::HashMismatch { expected, computed });
        }
        self.insert(computed, bytes);
        Ok(())
    }

    fn get(&self, cid: &LocalCid) -> Option<Arc<[u8]>> {
        self.blocks.get(cid).cloned()
    }

    fn has(&self, cid: &LocalCid) -> bool {
        self.blocks.contains_key(cid)
    }

    fn cids(&self) -> Vec<LocalCid> {
        self.blocks.keys().copied().collect()
    }
}
