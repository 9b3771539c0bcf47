// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Backup orchestration: extract a snapshot, upload it, report.

use oplog_app_core::BridgeSettings;
use tracing::{info, warn};

use crate::engine::LogHandle;
use crate::error::BridgeError;
use crate::extract::extract_snapshot;
use crate::remote::RemoteStore;
use crate::report::BackupReport;
use crate::transfer::upload_blocks;

/// Back up the log behind `handle` to `remote`.
///
/// Individual upload failures are reported in [`BackupReport::failed`]; the
/// call only fails outright when the snapshot is empty or when no block at
/// all was accepted.
pub async fn backup<H, R>(
    handle: &H,
    remote: &R,
    settings: &BridgeSettings,
) -> Result<BackupReport, BridgeError>
where
    H: LogHandle + ?Sized,
    R: RemoteStore + ?Sized,
{
    let snapshot = extract_snapshot(handle).await?;
    let blocks = snapshot.to_vec();
    info!(
        address = %snapshot.address(),
        blocks = blocks.len(),
        max_in_flight = settings.max_in_flight,
        "uploading snapshot"
    );

    let uploads = upload_blocks(remote, &blocks, settings.max_in_flight).await;
    if uploads.successful.is_empty() {
        return Err(BridgeError::NoBlocksUploaded {
            failed: uploads.failed.len(),
        });
    }
    if !uploads.failed.is_empty() {
        warn!(
            address = %snapshot.address(),
            failed = uploads.failed.len(),
            "backup is partial"
        );
    }

    let report = BackupReport {
        success: true,
        root_cid: snapshot.root(),
        address: snapshot.address().clone(),
        blocks_total: blocks.len(),
        blocks_uploaded: uploads.successful.len(),
        category_counts: snapshot.category_counts(),
        mapping: uploads.mapping(),
        failed: uploads.failed,
    };
    info!(
        address = %report.address,
        uploaded = report.blocks_uploaded,
        total = report.blocks_total,
        "backup finished"
    );
    Ok(report)
}
