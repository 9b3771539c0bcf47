// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Restore orchestration.
//!
//! Two entry points share one tail. [`restore_from_mapping`] trusts a mapping
//! produced by a backup and only downloads what it names.
//! [`restore_from_space`] has nothing but the remote listing: it downloads
//! everything, classifies each block by shape and picks the root descriptor
//! per [`RootSelection`].
//!
//! Either way the root descriptor says nothing about heads, so the head set
//! is recovered structurally from the restored entries and handed to the
//! engine with [`LogHandle::join_heads`] after the database is reopened.

use std::collections::{BTreeMap, BTreeSet};

use oplog_app_core::{BridgeSettings, RootSelection};
use oplog_block::BlockCategory;
use oplog_cid::{local_cid_of, LocalCid, RemoteCid};
use tracing::{debug, info, warn};

use crate::address::DbAddress;
use crate::engine::{LogEngine, LogHandle};
use crate::error::BridgeError;
use crate::mapping::IdentifierMapping;
use crate::reconstruct::ReconstructionSession;
use crate::remote::{BlockFetcher, RemoteStore};
use crate::report::{BlockFailure, FailureReason, RestoreReport};
use crate::transfer::{download_blocks, DownloadedBlock};

/// Inputs for [`restore_from_space`] beyond the settings.
#[derive(Debug, Clone, Default)]
pub struct SpaceRestoreOptions {
    /// Address to restore. Its root overrides [`RootSelection`]; the space
    /// must contain that root descriptor.
    pub expected_address: Option<DbAddress>,
}

impl SpaceRestoreOptions {
    /// Options pinned to `address`.
    pub fn for_address(address: DbAddress) -> Self {
        Self {
            expected_address: Some(address),
        }
    }
}

/// A downloaded block whose bytes hash to its translated CID.
struct VerifiedBlock {
    cid: LocalCid,
    bytes: Vec<u8>,
}

/// Accumulators of one restore invocation.
#[derive(Default)]
struct RestoreState {
    session: ReconstructionSession,
    blocks: Vec<VerifiedBlock>,
    /// CIDs the engine accepted
    stored: BTreeSet<LocalCid>,
    mismatches: usize,
    failed: Vec<BlockFailure>,
}

impl RestoreState {
    /// Digest-check one download and keep it if it holds.
    fn accept(&mut self, download: DownloadedBlock) {
        let translated = download.remote.to_local();
        match local_cid_of(&download.bytes) {
            Ok(computed) if computed == translated => {
                let category = self.session.observe(translated, &download.bytes);
                debug!(cid = %translated, %category, "block verified");
                self.blocks.push(VerifiedBlock {
                    cid: translated,
                    bytes: download.bytes,
                });
            }
            Ok(computed) => {
                warn!(cid = %translated, %computed, "downloaded bytes do not match their CID");
                self.failed.push(BlockFailure::remote(
                    &download.remote,
                    FailureReason::DigestMismatch {
                        expected: translated,
                        computed,
                    },
                ));
            }
            Err(err) => {
                warn!(cid = %translated, error = %err, "could not hash downloaded bytes");
                self.failed.push(BlockFailure::remote(
                    &download.remote,
                    FailureReason::BlockUnavailable {
                        detail: err.to_string(),
                    },
                ));
            }
        }
    }

    /// Write every verified block to the engine's store.
    async fn store<E>(&mut self, engine: &E)
    where
        E: LogEngine + ?Sized,
    {
        for block in std::mem::take(&mut self.blocks) {
            match engine.put_block(&block.cid, &block.bytes).await {
                Ok(()) => {
                    self.stored.insert(block.cid);
                }
                Err(err) => {
                    warn!(cid = %block.cid, error = %err, "engine refused block");
                    self.failed.push(BlockFailure::local(
                        &block.cid,
                        FailureReason::StoreFailed {
                            detail: err.to_string(),
                        },
                    ));
                }
            }
        }
    }
}

/// Restore `address` from the blocks named in `mapping`.
pub async fn restore_from_mapping<E, F>(
    engine: &E,
    fetcher: &F,
    address: &DbAddress,
    mapping: &IdentifierMapping,
    settings: &BridgeSettings,
) -> Result<RestoreReport, BridgeError>
where
    E: LogEngine + ?Sized,
    F: BlockFetcher + ?Sized,
{
    let mut expected: BTreeMap<RemoteCid, LocalCid> = BTreeMap::new();
    for (local, remote) in mapping.iter() {
        expected.entry(*remote).or_insert(*local);
    }
    let remotes: Vec<RemoteCid> = expected.keys().copied().collect();
    info!(%address, blocks = remotes.len(), "restoring from mapping");

    let downloads = download_blocks(fetcher, &remotes, settings.max_in_flight).await;
    let downloaded = downloads.successful.len();
    let mut state = RestoreState {
        failed: downloads.failed,
        ..RestoreState::default()
    };

    for download in downloads.successful {
        let translated = download.remote.to_local();
        if let Some(local) = expected.get(&download.remote) {
            if *local != translated {
                state.mismatches += 1;
                warn!(
                    remote = %download.remote,
                    expected = %local,
                    actual = %translated,
                    "translated CID differs from mapping"
                );
            }
        }
        state.accept(download);
    }

    let verified = downloaded - state.mismatches;
    if state.mismatches > verified {
        return Err(BridgeError::MismatchThresholdExceeded {
            mismatches: state.mismatches,
            verified,
        });
    }
    if state.session.entry_count() == 0 {
        return Err(BridgeError::NoEntriesFound {
            address: address.to_string(),
        });
    }
    if state.session.category_of(&address.root()) != Some(BlockCategory::RootDescriptor) {
        return Err(BridgeError::NoRootDescriptorFound {
            detail: format!("root descriptor {} was not restored", address.root()),
        });
    }

    state.store(engine).await;
    reopen(engine, address, state).await
}

/// Restore a database from everything listed in the remote space.
pub async fn restore_from_space<E, R, F>(
    engine: &E,
    remote: &R,
    fetcher: &F,
    options: &SpaceRestoreOptions,
    settings: &BridgeSettings,
) -> Result<RestoreReport, BridgeError>
where
    E: LogEngine + ?Sized,
    R: RemoteStore + ?Sized,
    F: BlockFetcher + ?Sized,
{
    let listing = remote.list().await?;
    info!(blocks = listing.len(), "restoring from space listing");

    let downloads = download_blocks(fetcher, &listing, settings.max_in_flight).await;
    let mut state = RestoreState {
        failed: downloads.failed,
        ..RestoreState::default()
    };
    for download in downloads.successful {
        state.accept(download);
    }
    info!(
        verified = state.blocks.len(),
        counts = ?state.session.category_counts(),
        "space classified"
    );

    let address = select_address(&state.session, options, settings)?;
    if state.session.entry_count() == 0 {
        return Err(BridgeError::NoEntriesFound {
            address: address.to_string(),
        });
    }

    state.store(engine).await;
    reopen(engine, &address, state).await
}

fn select_address(
    session: &ReconstructionSession,
    options: &SpaceRestoreOptions,
    settings: &BridgeSettings,
) -> Result<DbAddress, BridgeError> {
    let roots = session.root_descriptors();
    if let Some(address) = &options.expected_address {
        if roots.contains(&address.root()) {
            return Ok(address.clone());
        }
        return Err(BridgeError::NoRootDescriptorFound {
            detail: format!("space does not hold root descriptor {}", address.root()),
        });
    }

    let root = match roots.as_slice() {
        [] => {
            return Err(BridgeError::NoRootDescriptorFound {
                detail: "space holds no root descriptor".to_owned(),
            })
        }
        [only] => *only,
        [lowest, ..] => match settings.root_selection {
            RootSelection::Strict => {
                return Err(BridgeError::AmbiguousRoot { candidates: roots })
            }
            RootSelection::Lowest => {
                warn!(
                    chosen = %lowest,
                    candidates = roots.len(),
                    "several root descriptors in space; using the lowest CID"
                );
                *lowest
            }
        },
    };
    Ok(DbAddress::new(&settings.address_scheme, root))
}

/// Open `address`, join the recovered heads and report what the engine sees.
async fn reopen<E>(
    engine: &E,
    address: &DbAddress,
    state: RestoreState,
) -> Result<RestoreReport, BridgeError>
where
    E: LogEngine + ?Sized,
{
    // An entry the engine refused cannot be joined; what it linked to stands
    // in for it.
    let recovered = state
        .session
        .heads_for_log(&address.to_string(), |cid| state.stored.contains(cid));
    debug!(%address, heads = recovered.len(), "joining recovered heads");

    let mut handle = engine.open(address).await?;
    handle.join_heads(&recovered).await?;
    let entries_recovered = handle.all_entries().await?.len();
    let mut heads = handle.current_heads().await?;
    heads.sort();
    let address_match = handle.address() == address;
    if !address_match {
        warn!(expected = %address, actual = %handle.address(), "engine reopened at another address");
    }

    let report = RestoreReport {
        success: address_match && entries_recovered > 0,
        address: address.clone(),
        address_match,
        entries_recovered,
        blocks_restored: state.stored.len(),
        heads,
        mismatches: state.mismatches,
        category_counts: state.session.category_counts(),
        failed: state.failed,
    };
    info!(
        address = %report.address,
        entries = report.entries_recovered,
        blocks = report.blocks_restored,
        failed = report.failed.len(),
        "restore finished"
    );
    Ok(report)
}
