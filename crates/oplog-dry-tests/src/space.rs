// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory remote space double.
//!
//! Acts as both the authenticated store and the gateway read path. Failures
//! are scripted: uploads by call ordinal, fetches and removals by CID.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use oplog_bridge::{BlockFetcher, RemoteError, RemoteStore};
use oplog_cid::{remote_cid_of, RemoteCid};

#[derive(Default)]
struct SpaceInner {
    blocks: BTreeMap<RemoteCid, Vec<u8>>,
    failing_uploads: BTreeSet<usize>,
    unavailable: BTreeSet<RemoteCid>,
    corrupted: BTreeMap<RemoteCid, Vec<u8>>,
    locked: BTreeSet<RemoteCid>,
    fail_listing: bool,
    upload_calls: usize,
    fetch_calls: usize,
}

/// Remote space held in memory.
#[derive(Clone, Default)]
pub struct MemorySpace {
    inner: Arc<Mutex<SpaceInner>>,
}

impl MemorySpace {
    /// Empty space.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SpaceInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fail the uploads with these 1-based call ordinals.
    pub fn fail_uploads(&self, ordinals: &[usize]) {
        self.lock().failing_uploads.extend(ordinals.iter().copied());
    }

    /// Make `cid` unfetchable while keeping it listed.
    pub fn make_unavailable(&self, cid: RemoteCid) {
        self.lock().unavailable.insert(cid);
    }

    /// Serve `bytes` for `cid` instead of its real content.
    pub fn corrupt(&self, cid: RemoteCid, bytes: Vec<u8>) {
        self.lock().corrupted.insert(cid, bytes);
    }

    /// Make [`RemoteStore::remove`] fail for `cid`.
    pub fn lock_block(&self, cid: RemoteCid) {
        self.lock().locked.insert(cid);
    }

    /// Make [`RemoteStore::list`] fail.
    pub fn fail_listing(&self, fail: bool) {
        self.lock().fail_listing = fail;
    }

    /// Store bytes directly, bypassing the upload counter.
    pub fn insert_raw(&self, bytes: &[u8]) -> Result<RemoteCid, RemoteError> {
        let cid = remote_cid_of(bytes).map_err(|err| RemoteError::Rejected(err.to_string()))?;
        self.lock().blocks.insert(cid, bytes.to_vec());
        Ok(cid)
    }

    /// `true` if `cid` is stored.
    pub fn contains(&self, cid: &RemoteCid) -> bool {
        self.lock().blocks.contains_key(cid)
    }

    /// Number of stored blocks.
    pub fn len(&self) -> usize {
        self.lock().blocks.len()
    }

    /// `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.lock().blocks.is_empty()
    }

    /// Upload attempts so far, failed ones included.
    pub fn upload_calls(&self) -> usize {
        self.lock().upload_calls
    }

    /// Fetch attempts so far, failed ones included.
    pub fn fetch_calls(&self) -> usize {
        self.lock().fetch_calls
    }
}

#[async_trait]
impl RemoteStore for MemorySpace {
    async fn upload(&self, bytes: &[u8]) -> Result<RemoteCid, RemoteError> {
        let mut inner = self.lock();
        inner.upload_calls += 1;
        if inner.failing_uploads.contains(&inner.upload_calls) {
            return Err(RemoteError::Rejected(format!(
                "upload #{} rejected",
                inner.upload_calls
            )));
        }
        let cid = remote_cid_of(bytes).map_err(|err| RemoteError::Rejected(err.to_string()))?;
        inner.blocks.insert(cid, bytes.to_vec());
        Ok(cid)
    }

    async fn list(&self) -> Result<Vec<RemoteCid>, RemoteError> {
        let inner = self.lock();
        if inner.fail_listing {
            return Err(RemoteError::Transport("listing unavailable".to_owned()));
        }
        Ok(inner.blocks.keys().copied().collect())
    }

    async fn remove(&self, cid: &RemoteCid) -> Result<(), RemoteError> {
        let mut inner = self.lock();
        if inner.locked.contains(cid) {
            return Err(RemoteError::Rejected(format!("{cid} is locked")));
        }
        inner
            .blocks
            .remove(cid)
            .map(|_| ())
            .ok_or_else(|| RemoteError::Rejected(format!("{cid} is not in the space")))
    }
}

#[async_trait]
impl BlockFetcher for MemorySpace {
    async fn fetch(&self, cid: &RemoteCid) -> Result<Vec<u8>, RemoteError> {
        let mut inner = self.lock();
        inner.fetch_calls += 1;
        let unavailable = || RemoteError::BlockUnavailable {
            cid: *cid,
            attempts: 1,
            last: "not served".to_owned(),
        };
        if inner.unavailable.contains(cid) {
            return Err(unavailable());
        }
        if let Some(bytes) = inner.corrupted.get(cid) {
            return Ok(bytes.clone());
        }
        inner.blocks.get(cid).cloned().ok_or_else(unavailable)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_upload_failures_follow_call_order() {
        let space = MemorySpace::new();
        space.fail_uploads(&[2]);
        assert!(space.upload(b"one").await.is_ok());
        assert!(space.upload(b"two").await.is_err());
        assert!(space.upload(b"three").await.is_ok());
        assert_eq!(space.upload_calls(), 3);
        assert_eq!(space.len(), 2);
    }

    #[tokio::test]
    async fn fetch_serves_uploaded_bytes() {
        let space = MemorySpace::new();
        let cid = space.upload(b"block").await.unwrap();
        assert_eq!(space.fetch(&cid).await.unwrap(), b"block");
        space.make_unavailable(cid);
        assert!(matches!(
            space.fetch(&cid).await,
            Err(RemoteError::BlockUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn remove_and_list() {
        let space = MemorySpace::new();
        let a = space.insert_raw(b"a").unwrap();
        let b = space.insert_raw(b"b").unwrap();
        space.lock_block(b);
        space.remove(&a).await.unwrap();
        assert!(space.remove(&b).await.is_err());
        assert_eq!(space.list().await.unwrap(), vec![b]);
    }
}
