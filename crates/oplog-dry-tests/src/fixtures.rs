// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ready-made logs and spaces.

use oplog_bridge::{EngineError, RemoteError};
use oplog_cid::{LocalCid, RemoteCid};

use crate::engine::{MemoryLog, MemoryLogEngine, TestSigner};
use crate::space::MemorySpace;

/// Seed used for the signer of every fixture log.
pub const FIXTURE_SIGNER: &str = "fixture-signer";

/// Linear log named `name` with `len` entries. Returns the log and its
/// entries in append order.
pub fn linear_log(
    engine: &MemoryLogEngine,
    name: &str,
    len: usize,
) -> Result<(MemoryLog, Vec<LocalCid>), EngineError> {
    let mut log = engine.create_database(name, TestSigner::from_seed(FIXTURE_SIGNER))?;
    let mut entries = Vec::with_capacity(len);
    for index in 0..len {
        entries.push(log.append(&format!("{name}-{index}"))?);
    }
    Ok((log, entries))
}

/// Entries of [`branching_log`].
#[derive(Debug, Clone, Copy)]
pub struct Branching {
    /// Genesis entry.
    pub e1: LocalCid,
    /// `e1 <- e2`.
    pub e2: LocalCid,
    /// `e2 <- e3`, a head.
    pub e3: LocalCid,
    /// `e1 <- e4`, a head.
    pub e4: LocalCid,
}

/// Log `E1 <- E2 <- E3` with a second branch `E1 <- E4`.
pub fn branching_log(engine: &MemoryLogEngine) -> Result<(MemoryLog, Branching), EngineError> {
    let mut log = engine.create_database("branching", TestSigner::from_seed(FIXTURE_SIGNER))?;
    let e1 = log.append("e1")?;
    let e2 = log.append_after(&[e1], "e2")?;
    let e3 = log.append_after(&[e2], "e3")?;
    let e4 = log.append_after(&[e1], "e4")?;
    Ok((log, Branching { e1, e2, e3, e4 }))
}

/// Copy every block of `engine` into `space`, as a complete backup would.
pub fn mirror_into_space(
    engine: &MemoryLogEngine,
    space: &MemorySpace,
) -> Result<Vec<RemoteCid>, RemoteError> {
    let mut remote = Vec::new();
    for cid in engine.stored_cids() {
        if let Some(bytes) = engine.block(&cid) {
            remote.push(space.insert_raw(&bytes)?);
        }
    }
    Ok(remote)
}
