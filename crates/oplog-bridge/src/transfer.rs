// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Batch transfers with per-item failure isolation.
//!
//! Every function here processes its items independently and partitions the
//! outcomes into successes and [`BlockFailure`]s; none of them returns early
//! on a failed item. Up to `max_in_flight` requests run at once and results
//! come back in input order.

use futures_util::stream::{self, StreamExt};
use oplog_block::BlockCategory;
use oplog_cid::{local_cid_of, LocalCid, RemoteCid};
use tracing::{debug, warn};

use crate::extract::SnapshotBlock;
use crate::mapping::IdentifierMapping;
use crate::remote::{BlockFetcher, RemoteError, RemoteStore};
use crate::report::{BlockFailure, FailureReason};

/// A block the remote store accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedBlock {
    /// Local CID.
    pub local: LocalCid,
    /// CID the store returned.
    pub remote: RemoteCid,
    /// Category, for reporting.
    pub category: BlockCategory,
}

/// Partitioned upload outcomes.
#[derive(Debug, Clone, Default)]
pub struct UploadReport {
    /// Accepted blocks, in input order.
    pub successful: Vec<UploadedBlock>,
    /// Rejected blocks, keyed by local CID.
    pub failed: Vec<BlockFailure>,
}

impl UploadReport {
    /// Mapping of every accepted block.
    pub fn mapping(&self) -> IdentifierMapping {
        self.successful
            .iter()
            .map(|block| (block.local, block.remote))
            .collect()
    }
}

/// A block fetched from the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedBlock {
    /// CID it was fetched under.
    pub remote: RemoteCid,
    /// Raw bytes.
    pub bytes: Vec<u8>,
}

/// Partitioned download outcomes.
#[derive(Debug, Clone, Default)]
pub struct DownloadReport {
    /// Fetched blocks, in input order.
    pub successful: Vec<DownloadedBlock>,
    /// Blocks no gateway could serve, keyed by remote CID.
    pub failed: Vec<BlockFailure>,
}

/// Partitioned removal outcomes.
#[derive(Debug, Clone, Default)]
pub struct RemovalReport {
    /// Removed blocks.
    pub removed: Vec<RemoteCid>,
    /// Blocks the store refused to remove.
    pub failed: Vec<BlockFailure>,
}

/// Outcome of [`verify_mapping`].
#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    /// Pairs whose remote block was fetched and hashes to the local CID.
    pub verified: usize,
    /// Pairs that could not be fetched or did not match.
    pub failed: Vec<BlockFailure>,
}

impl VerificationReport {
    /// `true` when every pair verified.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Upload each block's bytes.
pub async fn upload_blocks<R>(
    remote: &R,
    blocks: &[SnapshotBlock],
    max_in_flight: usize,
) -> UploadReport
where
    R: RemoteStore + ?Sized,
{
    let outcomes: Vec<_> = stream::iter(blocks)
        .map(|block| async move { (block, remote.upload(&block.bytes).await) })
        .buffered(max_in_flight.max(1))
        .collect()
        .await;

    let mut report = UploadReport::default();
    for (block, outcome) in outcomes {
        match outcome {
            Ok(remote_cid) => {
                if remote_cid != block.cid.to_remote() {
                    warn!(
                        local = %block.cid,
                        remote = %remote_cid,
                        "store returned a CID with a different digest"
                    );
                }
                debug!(
                    local = %block.cid,
                    remote = %remote_cid,
                    category = %block.category,
                    "uploaded"
                );
                report.successful.push(UploadedBlock {
                    local: block.cid,
                    remote: remote_cid,
                    category: block.category,
                });
            }
            Err(err) => {
                warn!(
                    local = %block.cid,
                    category = %block.category,
                    error = %err,
                    "upload failed"
                );
                report.failed.push(BlockFailure::local(
                    &block.cid,
                    FailureReason::UploadFailed {
                        detail: err.to_string(),
                    },
                ));
            }
        }
    }
    report
}

/// Fetch each remote CID.
pub async fn download_blocks<F>(
    fetcher: &F,
    cids: &[RemoteCid],
    max_in_flight: usize,
) -> DownloadReport
where
    F: BlockFetcher + ?Sized,
{
    let outcomes: Vec<_> = stream::iter(cids)
        .map(|cid| async move { (*cid, fetcher.fetch(cid).await) })
        .buffered(max_in_flight.max(1))
        .collect()
        .await;

    let mut report = DownloadReport::default();
    for (cid, outcome) in outcomes {
        match outcome {
            Ok(bytes) => report.successful.push(DownloadedBlock { remote: cid, bytes }),
            Err(err) => {
                warn!(remote = %cid, error = %err, "download failed");
                report
                    .failed
                    .push(BlockFailure::remote(&cid, unavailable(&err)));
            }
        }
    }
    report
}

/// Remove each remote CID from the space.
pub async fn remove_blocks<R>(
    remote: &R,
    cids: &[RemoteCid],
    max_in_flight: usize,
) -> RemovalReport
where
    R: RemoteStore + ?Sized,
{
    let outcomes: Vec<_> = stream::iter(cids)
        .map(|cid| async move { (*cid, remote.remove(cid).await) })
        .buffered(max_in_flight.max(1))
        .collect()
        .await;

    let mut report = RemovalReport::default();
    for (cid, outcome) in outcomes {
        match outcome {
            Ok(()) => report.removed.push(cid),
            Err(err) => {
                warn!(remote = %cid, error = %err, "remove failed");
                report.failed.push(BlockFailure::remote(
                    &cid,
                    FailureReason::RemoveFailed {
                        detail: err.to_string(),
                    },
                ));
            }
        }
    }
    report
}

/// Check that every mapped block is fetchable and hashes to its local CID.
pub async fn verify_mapping<F>(
    fetcher: &F,
    mapping: &IdentifierMapping,
    max_in_flight: usize,
) -> VerificationReport
where
    F: BlockFetcher + ?Sized,
{
    let outcomes: Vec<_> = stream::iter(mapping.iter())
        .map(|(local, remote)| async move { (*local, *remote, fetcher.fetch(remote).await) })
        .buffered(max_in_flight.max(1))
        .collect()
        .await;

    let mut report = VerificationReport::default();
    for (local, remote, outcome) in outcomes {
        let bytes = match outcome {
            Ok(bytes) => bytes,
            Err(err) => {
                report
                    .failed
                    .push(BlockFailure::remote(&remote, unavailable(&err)));
                continue;
            }
        };
        let translated = remote.to_local();
        if translated != local {
            report.failed.push(BlockFailure::remote(
                &remote,
                FailureReason::IdentifierMismatch {
                    expected: local,
                    actual: translated,
                },
            ));
            continue;
        }
        match local_cid_of(&bytes) {
            Ok(computed) if computed == local => report.verified += 1,
            Ok(computed) => report.failed.push(BlockFailure::remote(
                &remote,
                FailureReason::DigestMismatch {
                    expected: local,
                    computed,
                },
            )),
            Err(err) => report.failed.push(BlockFailure::remote(
                &remote,
                FailureReason::BlockUnavailable {
                    detail: err.to_string(),
                },
            )),
        }
    }
    report
}

fn unavailable(err: &RemoteError) -> FailureReason {
    FailureReason::BlockUnavailable {
        detail: err.to_string(),
    }
}
