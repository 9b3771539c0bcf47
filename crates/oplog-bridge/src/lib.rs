// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Block bridging and log reconstruction between a local hash-linked log and
//! a remote content-addressed store.
//!
//! # Flow
//!
//! Backup: [`extract_snapshot`] walks an open log and collects its root
//! descriptor, permission descriptor, signer descriptors and reachable
//! entries; [`upload_blocks`] pushes them to a [`RemoteStore`]; [`backup`]
//! composes both and returns the [`IdentifierMapping`].
//!
//! Restore: [`restore_from_mapping`] downloads the mapped blocks through a
//! [`BlockFetcher`] and translates their identifiers back; [`restore_from_space`]
//! needs no mapping and instead lists the whole remote space, classifies each
//! block by shape and recovers the head set structurally with a
//! [`ReconstructionSession`]. Both hand the populated local store to the
//! [`LogEngine`] to reopen the database at its original address.
//!
//! # Failure Model
//!
//! Per-block failures (an unavailable block, a rejected upload, a CID that
//! does not translate to what was expected) are collected as
//! [`BlockFailure`]s and reported in counts. Only preconditions that make the
//! whole operation meaningless surface as [`BridgeError`].
#![forbid(unsafe_code)]

pub mod address;
pub mod backup;
pub mod engine;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod mapping;
pub mod reconstruct;
pub mod remote;
pub mod report;
pub mod restore;
pub mod transfer;

pub use address::DbAddress;
pub use backup::backup;
pub use engine::{EngineError, LogEngine, LogHandle};
pub use error::BridgeError;
pub use extract::{extract_snapshot, Snapshot, SnapshotBlock};
pub use gateway::{GatewayFetcher, DEFAULT_MAX_BLOCK_BYTES};
pub use mapping::IdentifierMapping;
pub use reconstruct::{compute_heads, ReconstructionSession};
pub use remote::{BlockFetcher, RemoteError, RemoteStore};
pub use report::{BackupReport, BlockFailure, CategoryCounts, FailureReason, RestoreReport};
pub use restore::{restore_from_mapping, restore_from_space, SpaceRestoreOptions};
pub use transfer::{
    download_blocks, remove_blocks, upload_blocks, verify_mapping, DownloadReport,
    DownloadedBlock, RemovalReport, UploadReport, UploadedBlock, VerificationReport,
};
