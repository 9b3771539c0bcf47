// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Snapshot extraction from an open log.
//!
//! A snapshot is every block needed to reopen the database elsewhere: the
//! reachable entries, the root descriptor, its permission descriptor and the
//! signer descriptors the entries reference. Extraction is best-effort over
//! what the local store holds; only an empty entry set or a missing root
//! descriptor abort it.

use std::collections::{BTreeMap, BTreeSet};

use oplog_block::classify::try_parse_log_entry;
use oplog_block::{classify_bytes, decode_value, BlockCategory, Classified};
use oplog_cid::LocalCid;
use tracing::{info, warn};

use crate::address::DbAddress;
use crate::engine::LogHandle;
use crate::error::BridgeError;
use crate::report::CategoryCounts;

/// One block of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotBlock {
    /// Local CID.
    pub cid: LocalCid,
    /// Raw bytes, exactly as stored locally.
    pub bytes: Vec<u8>,
    /// Role in the snapshot. Used for reporting only.
    pub category: BlockCategory,
}

/// Deduplicated block set for one database at one point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    address: DbAddress,
    blocks: BTreeMap<LocalCid, SnapshotBlock>,
}

impl Snapshot {
    /// Empty snapshot for `address`.
    pub fn new(address: DbAddress) -> Self {
        Self {
            address,
            blocks: BTreeMap::new(),
        }
    }

    /// Address the snapshot was taken from.
    pub fn address(&self) -> &DbAddress {
        &self.address
    }

    /// Root descriptor CID.
    pub fn root(&self) -> LocalCid {
        self.address.root()
    }

    /// Add a block. A CID already present keeps its first category.
    /// Returns `true` if the block was new.
    pub fn insert(&mut self, cid: LocalCid, bytes: Vec<u8>, category: BlockCategory) -> bool {
        if self.blocks.contains_key(&cid) {
            return false;
        }
        self.blocks.insert(
            cid,
            SnapshotBlock {
                cid,
                bytes,
                category,
            },
        );
        true
    }

    /// Block by CID.
    pub fn get(&self, cid: &LocalCid) -> Option<&SnapshotBlock> {
        self.blocks.get(cid)
    }

    /// Blocks in CID order.
    pub fn blocks(&self) -> impl Iterator<Item = &SnapshotBlock> {
        self.blocks.values()
    }

    /// Blocks in CID order, owned.
    pub fn to_vec(&self) -> Vec<SnapshotBlock> {
        self.blocks.values().cloned().collect()
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// `true` if the snapshot holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block count per category.
    pub fn category_counts(&self) -> CategoryCounts {
        let mut counts = CategoryCounts::new();
        for block in self.blocks.values() {
            *counts.entry(block.category).or_default() += 1;
        }
        counts
    }
}

/// Collect the snapshot of the log behind `handle`.
pub async fn extract_snapshot<H>(handle: &H) -> Result<Snapshot, BridgeError>
where
    H: LogHandle + ?Sized,
{
    let address = handle.address().clone();
    let mut snapshot = Snapshot::new(address.clone());

    let entries = handle.all_entries().await?;
    let mut identities = BTreeSet::new();
    for cid in entries {
        let Some(bytes) = fetch_optional(handle, &cid, BlockCategory::LogEntry).await else {
            continue;
        };
        match decode_value(&bytes).ok().as_ref().and_then(try_parse_log_entry) {
            Some(view) => identities.extend(view.identity),
            None => warn!(%cid, "entry does not have the expected shape"),
        }
        snapshot.insert(cid, bytes, BlockCategory::LogEntry);
    }
    if snapshot.is_empty() {
        return Err(BridgeError::NoEntriesFound {
            address: address.to_string(),
        });
    }

    let root = address.root();
    let root_bytes = handle
        .get_raw_bytes(&root)
        .await?
        .ok_or_else(|| BridgeError::NoRootDescriptorFound {
            detail: format!("root descriptor {root} is not in the local store"),
        })?;
    let manifest = match classify_bytes(&root_bytes) {
        Classified::RootDescriptor(view) => view,
        other => {
            return Err(BridgeError::NoRootDescriptorFound {
                detail: format!("{root} classifies as {}", other.category()),
            })
        }
    };
    snapshot.insert(root, root_bytes, BlockCategory::RootDescriptor);

    match manifest.access_controller {
        Some(ac) => {
            if let Some(bytes) =
                fetch_optional(handle, &ac, BlockCategory::PermissionDescriptor).await
            {
                snapshot.insert(ac, bytes, BlockCategory::PermissionDescriptor);
            }
        }
        None => warn!(%root, "root descriptor has no usable permission reference"),
    }

    for cid in identities {
        if let Some(bytes) = fetch_optional(handle, &cid, BlockCategory::SignerDescriptor).await {
            snapshot.insert(cid, bytes, BlockCategory::SignerDescriptor);
        }
    }

    info!(
        address = %address,
        blocks = snapshot.len(),
        counts = ?snapshot.category_counts(),
        "snapshot extracted"
    );
    Ok(snapshot)
}

async fn fetch_optional<H>(
    handle: &H,
    cid: &LocalCid,
    category: BlockCategory,
) -> Option<Vec<u8>>
where
    H: LogHandle + ?Sized,
{
    match handle.get_raw_bytes(cid).await {
        Ok(Some(bytes)) => Some(bytes),
        Ok(None) => {
            warn!(%cid, %category, "block missing from local store; skipping");
            None
        }
        Err(err) => {
            warn!(%cid, %category, error = %err, "block read failed; skipping");
            None
        }
    }
}
