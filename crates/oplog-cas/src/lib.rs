// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Local content-addressed block store.
//!
//! `oplog-cas` provides a [`BlockStore`] trait keyed by [`LocalCid`] and an
//! in-memory implementation, [`MemoryTier`]. It backs the local log engine
//! double and is the place restored blocks land before the engine reopens a
//! database.
//!
//! # Hash Policy
//!
//! Keys are sha2-256 over the raw block bytes, framed as local CIDs. The key
//! is always derived from content; [`BlockStore::put_verified`] refuses bytes
//! whose digest disagrees with the declared key.
//!
//! # Determinism Invariant
//!
//! [`BlockStore::cids`] returns keys sorted by CID, never in map order.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions
)]

mod memory;
pub use memory::MemoryTier;

use oplog_cid::{CidError, LocalCid};
use std::sync::Arc;

/// Errors that can occur during block store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CasError {
    /// Block bytes did not match the declared CID.
    #[error("[CAS_HASH_MISMATCH] expected {expected}, computed {computed}")]
    HashMismatch {
        /// The CID that was declared/expected.
        expected: LocalCid,
        /// The CID actually computed from the bytes.
        computed: LocalCid,
    },
    /// The CID of the bytes could not be computed.
    #[error(transparent)]
    Cid(#[from] CidError),
}

/// Content-addressed block store keyed by local CID.
///
/// # Absence Semantics
///
/// [`get`](BlockStore::get) returns `None` for missing blocks. Missing blocks
/// are expected (not yet restored, never written); error variants are
/// reserved for integrity violations.
pub trait BlockStore {
    /// Compute the CID and store. Returns the CID.
    fn put(&mut self, bytes: &[u8]) -> Result<LocalCid, CasError>;

    /// Store under a pre-computed CID. Rejects if the bytes hash elsewhere.
    ///
    /// On mismatch the store is unchanged.
    fn put_verified(&mut self, expected: LocalCid, bytes: &[u8]) -> Result<(), CasError>;

    /// Retrieve a block by CID. `None` if not stored.
    fn get(&self, cid: &LocalCid) -> Option<Arc<[u8]>>;

    /// Check existence without retrieving.
    fn has(&self, cid: &LocalCid) -> bool;

    /// All stored CIDs, sorted.
    fn cids(&self) -> Vec<LocalCid>;
}
