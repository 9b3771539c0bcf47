// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Batch transfer helpers: verification, download and cleanup.
#![allow(clippy::unwrap_used)]

use oplog_app_core::BridgeSettings;
use oplog_bridge::{
    backup, download_blocks, remove_blocks, verify_mapping, FailureReason, IdentifierMapping,
};
use oplog_cid::local_cid_of;
use oplog_dry_tests::{linear_log, MemoryLogEngine, MemorySpace};

async fn backed_up_space() -> (MemorySpace, IdentifierMapping) {
    let engine = MemoryLogEngine::new();
    let (log, _) = linear_log(&engine, "transfer", 2).unwrap();
    let space = MemorySpace::new();
    let report = backup(&log, &space, &BridgeSettings::default())
        .await
        .unwrap();
    (space, report.mapping)
}

#[tokio::test]
async fn fresh_backup_verifies_clean() {
    let (space, mapping) = backed_up_space().await;
    let report = verify_mapping(&space, &mapping, 2).await;
    assert!(report.is_clean());
    assert_eq!(report.verified, mapping.len());
}

#[tokio::test]
async fn verification_flags_each_kind_of_damage() {
    let (space, mapping) = backed_up_space().await;
    let mut pairs = mapping.iter().map(|(l, r)| (*l, *r));
    let (_, unavailable) = pairs.next().unwrap();
    let (_, corrupted) = pairs.next().unwrap();
    space.make_unavailable(unavailable);
    space.corrupt(corrupted, b"bit rot".to_vec());

    let mut damaged = mapping.clone();
    let stray = local_cid_of(b"stray").unwrap();
    let (_, reused) = pairs.next().unwrap();
    damaged.insert(stray, reused);

    let report = verify_mapping(&space, &damaged, 1).await;
    assert_eq!(report.failed.len(), 3);
    assert_eq!(report.verified, mapping.len() - 2);
    let kinds: Vec<_> = report.failed.iter().map(|f| &f.reason).collect();
    assert!(kinds
        .iter()
        .any(|r| matches!(r, FailureReason::BlockUnavailable { .. })));
    assert!(kinds
        .iter()
        .any(|r| matches!(r, FailureReason::DigestMismatch { .. })));
    assert!(kinds
        .iter()
        .any(|r| matches!(r, FailureReason::IdentifierMismatch { .. })));
}

#[tokio::test]
async fn download_partitions_and_keeps_input_order() {
    let (space, mapping) = backed_up_space().await;
    let remotes: Vec<_> = mapping.iter().map(|(_, r)| *r).collect();
    space.make_unavailable(remotes[1]);

    let report = download_blocks(&space, &remotes, 3).await;
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].cid, remotes[1].to_string());
    let fetched: Vec<_> = report.successful.iter().map(|b| b.remote).collect();
    let expected: Vec<_> = remotes
        .iter()
        .copied()
        .filter(|r| *r != remotes[1])
        .collect();
    assert_eq!(fetched, expected);
}

#[tokio::test]
async fn removal_keeps_going_past_refusals() {
    let (space, mapping) = backed_up_space().await;
    let remotes: Vec<_> = mapping.iter().map(|(_, r)| *r).collect();
    space.lock_block(remotes[0]);

    let report = remove_blocks(&space, &remotes, 1).await;
    assert_eq!(report.removed.len(), remotes.len() - 1);
    assert_eq!(report.failed.len(), 1);
    assert!(matches!(
        report.failed[0].reason,
        FailureReason::RemoveFailed { .. }
    ));
    assert_eq!(space.len(), 1);
}
