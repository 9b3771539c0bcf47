// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Operation-level errors.
//!
//! Per-block problems never show up here; they are reported through
//! [`BlockFailure`](crate::BlockFailure).

use oplog_app_core::ConfigError;
use oplog_cid::{CidError, LocalCid};

use crate::engine::EngineError;
use crate::remote::RemoteError;

/// Errors that abort a backup or restore.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The log has no retrievable entries.
    #[error("[NO_ENTRIES] no reachable entries for {address}")]
    NoEntriesFound {
        /// Address of the log.
        address: String,
    },
    /// No usable root descriptor.
    #[error("[NO_ROOT] {detail}")]
    NoRootDescriptorFound {
        /// What was missing or wrong.
        detail: String,
    },
    /// The remote space holds several root descriptors and the policy
    /// refuses to guess.
    #[error("[AMBIGUOUS_ROOT] {} root descriptors in space: {candidates:?}", .candidates.len())]
    AmbiguousRoot {
        /// Every root descriptor found, sorted.
        candidates: Vec<LocalCid>,
    },
    /// Every upload failed.
    #[error("[NO_UPLOADS] all {failed} uploads failed")]
    NoBlocksUploaded {
        /// Number of failed uploads.
        failed: usize,
    },
    /// More translated identifiers disagreed with the mapping than agreed.
    #[error("[MISMATCH_THRESHOLD] {mismatches} identifier mismatches against {verified} verified blocks")]
    MismatchThresholdExceeded {
        /// Blocks whose translated CID differed from the mapping.
        mismatches: usize,
        /// Blocks whose translated CID matched.
        verified: usize,
    },
    /// Address text could not be parsed.
    #[error("[BAD_ADDRESS] {input:?}: {reason}")]
    InvalidAddress {
        /// Offending text.
        input: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The local log engine failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The remote store failed an operation that has no per-item fallback.
    #[error(transparent)]
    Remote(#[from] RemoteError),
    /// Identifier error outside a per-block loop.
    #[error(transparent)]
    Cid(#[from] CidError),
    /// Settings were unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
