// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Port to the local log engine.
//!
//! The engine owns log/CRDT mechanics and its block store; the bridge only
//! reads raw blocks out of an open log and writes raw blocks back before
//! reopening one.

use async_trait::async_trait;
use oplog_cid::LocalCid;

use crate::address::DbAddress;

/// Errors reported by the local engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The address or block does not exist locally.
    #[error("[ENGINE_NOT_FOUND] {0}")]
    NotFound(String),
    /// Any other engine failure.
    #[error("[ENGINE] {0}")]
    Backend(String),
}

/// An open log.
#[async_trait]
pub trait LogHandle: Send + Sync {
    /// Address the log was opened at.
    fn address(&self) -> &DbAddress;

    /// Current head set.
    async fn current_heads(&self) -> Result<Vec<LocalCid>, EngineError>;

    /// CIDs of every entry reachable from the current heads.
    async fn all_entries(&self) -> Result<Vec<LocalCid>, EngineError>;

    /// Raw bytes of any locally stored block. `Ok(None)` if absent.
    async fn get_raw_bytes(&self, cid: &LocalCid) -> Result<Option<Vec<u8>>, EngineError>;

    /// Merge `heads` into the head set and resolve their history from the
    /// local block store.
    async fn join_heads(&mut self, heads: &[LocalCid]) -> Result<(), EngineError>;
}

/// The local log engine.
#[async_trait]
pub trait LogEngine: Send + Sync {
    /// Handle type returned by [`open`](LogEngine::open).
    type Handle: LogHandle;

    /// Open the database at `address`. Its root descriptor must be stored
    /// locally.
    async fn open(&self, address: &DbAddress) -> Result<Self::Handle, EngineError>;

    /// Store raw bytes under `cid` in the engine's block store.
    async fn put_block(&self, cid: &LocalCid, bytes: &[u8]) -> Result<(), EngineError>;
}
