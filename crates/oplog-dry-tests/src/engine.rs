// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory log engine double.
//!
//! Logs live in a shared [`MemoryTier`]; every handle opened from the same
//! engine sees the same blocks, which is how a restore and the log it
//! reopens meet. Entries, identities and manifests are written with the
//! real record shapes so the bridge classifies them like engine output.

use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use ciborium::value::Value;
use oplog_block::{
    decode, encode, AccessControllerRecord, Clock, EntryRecord, IdentityRecord,
    IdentitySignatures, Manifest, Payload,
};
use oplog_bridge::{DbAddress, EngineError, LogEngine, LogHandle};
use oplog_cas::{BlockStore, MemoryTier};
use oplog_cid::LocalCid;
use sha2::{Digest, Sha256};

/// Default address scheme of databases created by the double.
pub const DEFAULT_SCHEME: &str = "orbitdb";

/// Deterministic stand-in for a signing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSigner {
    id: String,
    public_key: String,
}

impl TestSigner {
    /// Signer whose keys are derived from `seed`.
    pub fn from_seed(seed: &str) -> Self {
        Self {
            id: fake_hex(&["id", seed]),
            public_key: fake_hex(&["pk", seed]),
        }
    }

    /// Identity id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Hex public key.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Signer descriptor for this key.
    pub fn identity_record(&self) -> IdentityRecord {
        IdentityRecord {
            id: self.id.clone(),
            public_key: self.public_key.clone(),
            signatures: IdentitySignatures {
                id: fake_hex(&["sig-id", self.id.as_str()]),
                public_key: fake_hex(&["sig-pk", self.public_key.as_str()]),
            },
            kind: "publickey".to_owned(),
        }
    }

    fn sign(&self, parts: &[&str]) -> String {
        let mut all = vec![self.public_key.as_str()];
        all.extend_from_slice(parts);
        fake_hex(&all)
    }
}

fn fake_hex(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

#[derive(Default)]
struct EngineInner {
    store: MemoryTier,
    refuse: BTreeSet<LocalCid>,
    put_count: usize,
}

/// Shared-store log engine.
#[derive(Clone, Default)]
pub struct MemoryLogEngine {
    inner: Arc<Mutex<EngineInner>>,
}

impl MemoryLogEngine {
    /// Engine with an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, EngineInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Write a block computed from `bytes`.
    pub fn put_raw(&self, bytes: &[u8]) -> Result<LocalCid, EngineError> {
        self.lock()
            .store
            .put(bytes)
            .map_err(|err| EngineError::Backend(err.to_string()))
    }

    /// Bytes of `cid`, if stored.
    pub fn block(&self, cid: &LocalCid) -> Option<Vec<u8>> {
        self.lock().store.get(cid).map(|bytes| bytes.to_vec())
    }

    /// `true` if `cid` is stored.
    pub fn has_block(&self, cid: &LocalCid) -> bool {
        self.lock().store.has(cid)
    }

    /// Delete a block, simulating local loss. Returns `true` if present.
    pub fn remove_block(&self, cid: &LocalCid) -> bool {
        self.lock().store.remove(cid)
    }

    /// Number of stored blocks.
    pub fn store_len(&self) -> usize {
        self.lock().store.len()
    }

    /// All stored CIDs, sorted.
    pub fn stored_cids(&self) -> Vec<LocalCid> {
        self.lock().store.cids()
    }

    /// Make [`LogEngine::put_block`] fail for `cid`.
    pub fn refuse_block(&self, cid: LocalCid) {
        self.lock().refuse.insert(cid);
    }

    /// Number of [`LogEngine::put_block`] calls, refused ones included.
    pub fn put_count(&self) -> usize {
        self.lock().put_count
    }

    /// Create a database named `name`: write its permission descriptor and
    /// manifest and return an empty log signed by `signer`.
    pub fn create_database(
        &self,
        name: &str,
        signer: TestSigner,
    ) -> Result<MemoryLog, EngineError> {
        let controller = encode(&AccessControllerRecord::new(vec![signer.id().to_owned()]))
            .map_err(backend)?;
        let controller_cid = self.put_raw(&controller)?;
        let manifest = Manifest::new(name, "events", &format!("/ipfs/{controller_cid}"));
        let root = self.put_raw(&encode(&manifest).map_err(backend)?)?;
        Ok(MemoryLog {
            address: DbAddress::new(DEFAULT_SCHEME, root),
            engine: self.clone(),
            heads: Vec::new(),
            signer,
            identity: None,
        })
    }
}

fn backend(err: impl std::fmt::Display) -> EngineError {
    EngineError::Backend(err.to_string())
}

#[async_trait]
impl LogEngine for MemoryLogEngine {
    type Handle = MemoryLog;

    async fn open(&self, address: &DbAddress) -> Result<MemoryLog, EngineError> {
        let bytes = self
            .block(&address.root())
            .ok_or_else(|| EngineError::NotFound(format!("manifest {}", address.root())))?;
        let manifest: Manifest = decode(&bytes).map_err(backend)?;
        Ok(MemoryLog {
            address: address.clone(),
            engine: self.clone(),
            heads: Vec::new(),
            signer: TestSigner::from_seed(&manifest.name),
            identity: None,
        })
    }

    async fn put_block(&self, cid: &LocalCid, bytes: &[u8]) -> Result<(), EngineError> {
        let mut inner = self.lock();
        inner.put_count += 1;
        if inner.refuse.contains(cid) {
            return Err(EngineError::Backend(format!("refused {cid}")));
        }
        inner.store.put_verified(*cid, bytes).map_err(backend)
    }
}

/// Handle to one log in a [`MemoryLogEngine`].
pub struct MemoryLog {
    address: DbAddress,
    engine: MemoryLogEngine,
    heads: Vec<LocalCid>,
    signer: TestSigner,
    identity: Option<LocalCid>,
}

impl MemoryLog {
    /// Engine backing this log.
    pub fn engine(&self) -> &MemoryLogEngine {
        &self.engine
    }

    /// Append `value` on top of the current heads.
    pub fn append(&mut self, value: &str) -> Result<LocalCid, EngineError> {
        let parents = self.heads.clone();
        self.append_after(&parents, value)
    }

    /// Append `value` with `parents` as its successor links. Parents stop
    /// being heads; other heads stay, so this is how branches are made.
    pub fn append_after(
        &mut self,
        parents: &[LocalCid],
        value: &str,
    ) -> Result<LocalCid, EngineError> {
        let identity = self.ensure_identity()?;
        let time = self.max_clock(parents)? + 1;
        let payload = Payload {
            op: "ADD".to_owned(),
            key: None,
            value: Some(Value::Text(value.to_owned())),
        };
        let log_id = self.address.to_string();
        let sig = self.signer.sign(&[log_id.as_str(), value, time.to_string().as_str()]);
        let entry = EntryRecord {
            v: 2,
            id: log_id,
            key: self.signer.public_key().to_owned(),
            sig,
            identity,
            payload,
            next: parents.to_vec(),
            refs: Vec::new(),
            clock: Clock {
                id: self.signer.public_key().to_owned(),
                time,
            },
        };
        let cid = self.engine.put_raw(&encode(&entry).map_err(backend)?)?;
        self.heads.retain(|head| !parents.contains(head));
        self.heads.push(cid);
        self.heads.sort();
        Ok(cid)
    }

    fn ensure_identity(&mut self) -> Result<LocalCid, EngineError> {
        if let Some(cid) = self.identity {
            return Ok(cid);
        }
        let bytes = encode(&self.signer.identity_record()).map_err(backend)?;
        let cid = self.engine.put_raw(&bytes)?;
        self.identity = Some(cid);
        Ok(cid)
    }

    fn max_clock(&self, parents: &[LocalCid]) -> Result<u64, EngineError> {
        let mut max = 0;
        for parent in parents {
            max = max.max(self.entry(parent)?.clock.time);
        }
        Ok(max)
    }

    fn entry(&self, cid: &LocalCid) -> Result<EntryRecord, EngineError> {
        let bytes = self
            .engine
            .block(cid)
            .ok_or_else(|| EngineError::NotFound(format!("entry {cid}")))?;
        decode(&bytes).map_err(backend)
    }

    /// Every entry reachable from `starts`, starts included. Missing
    /// blocks end their branch.
    fn reachable(&self, starts: &[LocalCid]) -> BTreeSet<LocalCid> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<LocalCid> = starts.iter().copied().collect();
        while let Some(cid) = queue.pop_front() {
            if !seen.insert(cid) {
                continue;
            }
            if let Ok(entry) = self.entry(&cid) {
                queue.extend(entry.next);
            }
        }
        seen.retain(|cid| self.engine.has_block(cid));
        seen
    }
}

#[async_trait]
impl LogHandle for MemoryLog {
    fn address(&self) -> &DbAddress {
        &self.address
    }

    async fn current_heads(&self) -> Result<Vec<LocalCid>, EngineError> {
        Ok(self.heads.clone())
    }

    async fn all_entries(&self) -> Result<Vec<LocalCid>, EngineError> {
        Ok(self.reachable(&self.heads).into_iter().collect())
    }

    async fn get_raw_bytes(&self, cid: &LocalCid) -> Result<Option<Vec<u8>>, EngineError> {
        Ok(self.engine.block(cid))
    }

    async fn join_heads(&mut self, heads: &[LocalCid]) -> Result<(), EngineError> {
        let mut candidates: BTreeSet<LocalCid> = self.heads.iter().copied().collect();
        for head in heads {
            self.entry(head)?;
            candidates.insert(*head);
        }
        let mut covered = BTreeSet::new();
        for candidate in &candidates {
            let next = self.entry(candidate)?.next;
            covered.extend(self.reachable(&next));
        }
        self.heads = candidates.difference(&covered).copied().collect();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn linear_log_has_one_head_and_all_entries() {
        let engine = MemoryLogEngine::new();
        let mut log = engine
            .create_database("events", TestSigner::from_seed("alice"))
            .unwrap();
        log.append("a").unwrap();
        log.append("b").unwrap();
        let c = log.append("c").unwrap();
        assert_eq!(log.current_heads().await.unwrap(), vec![c]);
        assert_eq!(log.all_entries().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn join_heads_drops_covered_heads() {
        let engine = MemoryLogEngine::new();
        let mut log = engine
            .create_database("events", TestSigner::from_seed("alice"))
            .unwrap();
        let e1 = log.append("1").unwrap();
        let e2 = log.append_after(&[e1], "2").unwrap();
        let e3 = log.append_after(&[e2], "3").unwrap();

        let mut reopened = engine.open(log.address()).await.unwrap();
        reopened.join_heads(&[e2, e3]).await.unwrap();
        assert_eq!(reopened.current_heads().await.unwrap(), vec![e3]);
        assert_eq!(reopened.all_entries().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn join_heads_rejects_unknown_entry() {
        let engine = MemoryLogEngine::new();
        let log = engine
            .create_database("events", TestSigner::from_seed("alice"))
            .unwrap();
        let stray = oplog_cid::local_cid_of(b"nope").unwrap();
        let mut reopened = engine.open(log.address()).await.unwrap();
        assert!(matches!(
            reopened.join_heads(&[stray]).await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn open_without_manifest_fails() {
        let engine = MemoryLogEngine::new();
        let root = oplog_cid::local_cid_of(b"missing").unwrap();
        let address = DbAddress::new(DEFAULT_SCHEME, root);
        assert!(matches!(
            engine.open(&address).await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn put_block_verifies_and_honours_refusals() {
        let engine = MemoryLogEngine::new();
        let cid = oplog_cid::local_cid_of(b"block").unwrap();
        let other = oplog_cid::local_cid_of(b"other").unwrap();
        assert!(engine.put_block(&cid, b"other").await.is_err());
        engine.refuse_block(other);
        assert!(engine.put_block(&other, b"other").await.is_err());
        engine.put_block(&cid, b"block").await.unwrap();
        assert!(engine.has_block(&cid));
        assert_eq!(engine.put_count(), 3);
    }
}
