// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ports to the remote content-addressed store.
//!
//! Writes, listing and removal go through an authenticated session
//! ([`RemoteStore`]); reads go through public gateways ([`BlockFetcher`]).
//! Establishing the session (key plus delegation proof) is the
//! implementation's business.

use async_trait::async_trait;
use oplog_cid::RemoteCid;

/// Errors reported by the remote store or gateways.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Every gateway attempt for one block failed.
    #[error("[BLOCK_UNAVAILABLE] {cid}: {attempts} attempt(s) failed, last: {last}")]
    BlockUnavailable {
        /// Block that could not be fetched.
        cid: RemoteCid,
        /// Number of gateway attempts made.
        attempts: usize,
        /// Last attempt's failure.
        last: String,
    },
    /// The store refused the request.
    #[error("[REMOTE_REJECTED] {0}")]
    Rejected(String),
    /// Network or protocol failure.
    #[error("[REMOTE_TRANSPORT] {0}")]
    Transport(String),
}

/// Authenticated remote store session.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Store `bytes`; the store computes and returns its own CID.
    async fn upload(&self, bytes: &[u8]) -> Result<RemoteCid, RemoteError>;

    /// Every block retrievable under the session's credential.
    async fn list(&self) -> Result<Vec<RemoteCid>, RemoteError>;

    /// Remove a block from the space.
    async fn remove(&self, cid: &RemoteCid) -> Result<(), RemoteError>;
}

/// Read path for remote blocks.
#[async_trait]
pub trait BlockFetcher: Send + Sync {
    /// Fetch the bytes of `cid`.
    async fn fetch(&self, cid: &RemoteCid) -> Result<Vec<u8>, RemoteError>;
}
