// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Result shapes returned to callers.
//!
//! Every report carries explicit success flags and counts so a caller can
//! tell "fully succeeded", "degraded but usable" and "failed" apart without
//! reading logs.

use std::collections::BTreeMap;
use std::fmt;

use oplog_block::BlockCategory;
use oplog_cid::{LocalCid, RemoteCid};
use serde::{Deserialize, Serialize};

use crate::address::DbAddress;
use crate::mapping::IdentifierMapping;

/// Block count per category.
pub type CategoryCounts = BTreeMap<BlockCategory, usize>;

/// Why one block was not transferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Every gateway attempt failed.
    BlockUnavailable {
        /// Last error seen.
        detail: String,
    },
    /// The remote store rejected the upload.
    UploadFailed {
        /// Store error.
        detail: String,
    },
    /// The store refused to remove the block.
    RemoveFailed {
        /// Store error.
        detail: String,
    },
    /// The translated CID differs from the one the mapping promised.
    IdentifierMismatch {
        /// CID the mapping expected.
        expected: LocalCid,
        /// CID obtained by translation.
        actual: LocalCid,
    },
    /// Downloaded bytes do not hash to their CID.
    DigestMismatch {
        /// CID the bytes were fetched under.
        expected: LocalCid,
        /// CID the bytes actually hash to.
        computed: LocalCid,
    },
    /// The local engine refused to store the block.
    StoreFailed {
        /// Engine error.
        detail: String,
    },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlockUnavailable { detail } => write!(f, "unavailable: {detail}"),
            Self::UploadFailed { detail } => write!(f, "upload failed: {detail}"),
            Self::RemoveFailed { detail } => write!(f, "remove failed: {detail}"),
            Self::IdentifierMismatch { expected, actual } => {
                write!(f, "identifier mismatch: expected {expected}, got {actual}")
            }
            Self::DigestMismatch { expected, computed } => {
                write!(f, "digest mismatch: expected {expected}, bytes hash to {computed}")
            }
            Self::StoreFailed { detail } => write!(f, "store failed: {detail}"),
        }
    }
}

/// One block that failed, with the CID text it was addressed by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockFailure {
    /// CID text (local or remote form, whichever the step used).
    pub cid: String,
    /// What went wrong.
    pub reason: FailureReason,
}

impl BlockFailure {
    /// Failure of a block addressed by its local CID.
    pub fn local(cid: &LocalCid, reason: FailureReason) -> Self {
        Self {
            cid: cid.to_string(),
            reason,
        }
    }

    /// Failure of a block addressed by its remote CID.
    pub fn remote(cid: &RemoteCid, reason: FailureReason) -> Self {
        Self {
            cid: cid.to_string(),
            reason,
        }
    }
}

/// Outcome of [`backup`](crate::backup()).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupReport {
    /// `true` when at least one block was uploaded.
    pub success: bool,
    /// Root descriptor CID.
    pub root_cid: LocalCid,
    /// Public address of the database.
    pub address: DbAddress,
    /// Blocks in the snapshot.
    pub blocks_total: usize,
    /// Blocks uploaded.
    pub blocks_uploaded: usize,
    /// Snapshot blocks per category.
    pub category_counts: CategoryCounts,
    /// Local to remote CIDs of the uploaded blocks.
    pub mapping: IdentifierMapping,
    /// Blocks that failed to upload.
    pub failed: Vec<BlockFailure>,
}

impl BackupReport {
    /// `true` when every snapshot block was uploaded.
    pub fn is_complete(&self) -> bool {
        self.success && self.blocks_uploaded == self.blocks_total
    }
}

/// Outcome of a restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreReport {
    /// `true` when the reopened log has entries at the expected address.
    pub success: bool,
    /// Address the database was reopened at.
    pub address: DbAddress,
    /// Whether the engine reports the expected address.
    pub address_match: bool,
    /// Entries reachable in the reopened log.
    pub entries_recovered: usize,
    /// Blocks written to the local store.
    pub blocks_restored: usize,
    /// Head set of the reopened log, sorted.
    pub heads: Vec<LocalCid>,
    /// Identifier mismatches seen while translating.
    pub mismatches: usize,
    /// Restored blocks per category.
    pub category_counts: CategoryCounts,
    /// Blocks that failed.
    pub failed: Vec<BlockFailure>,
}
