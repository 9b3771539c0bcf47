// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Local to remote identifier mapping produced by a backup.
//!
//! The mapping is a convenience, not a requirement: a restore that lost it
//! falls back to listing the remote space. Callers that want to keep it can
//! persist it through the config service under [`IdentifierMapping::config_key`].

use std::collections::BTreeMap;

use oplog_cid::{LocalCid, RemoteCid};
use serde::{Deserialize, Serialize};

/// `{local CID -> remote CID}` for one snapshot, ordered by local CID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentifierMapping(BTreeMap<LocalCid, RemoteCid>);

impl IdentifierMapping {
    /// Empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pair. Returns the previous remote CID for `local`, if any.
    pub fn insert(&mut self, local: LocalCid, remote: RemoteCid) -> Option<RemoteCid> {
        self.0.insert(local, remote)
    }

    /// Remote CID recorded for `local`.
    pub fn get(&self, local: &LocalCid) -> Option<&RemoteCid> {
        self.0.get(local)
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if no pairs are recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pairs in local CID order.
    pub fn iter(&self) -> impl Iterator<Item = (&LocalCid, &RemoteCid)> {
        self.0.iter()
    }

    /// Config key under which the mapping for `root` is conventionally kept.
    pub fn config_key(root: &LocalCid) -> String {
        format!("mapping-{root}")
    }
}

impl FromIterator<(LocalCid, RemoteCid)> for IdentifierMapping {
    fn from_iter<I: IntoIterator<Item = (LocalCid, RemoteCid)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use oplog_cid::local_cid_of;

    #[test]
    fn json_is_a_flat_object_of_text_cids() {
        let local = local_cid_of(b"block").unwrap();
        let mapping: IdentifierMapping = [(local, local.to_remote())].into_iter().collect();
        let json = serde_json::to_value(&mapping).unwrap();
        assert_eq!(json[local.to_string()], local.to_remote().to_string());
        let back: IdentifierMapping = serde_json::from_value(json).unwrap();
        assert_eq!(back, mapping);
    }

    #[test]
    fn insert_reports_replaced_value() {
        let local = local_cid_of(b"block").unwrap();
        let mut mapping = IdentifierMapping::new();
        assert!(mapping.insert(local, local.to_remote()).is_none());
        assert_eq!(mapping.insert(local, local.to_remote()), Some(local.to_remote()));
        assert_eq!(mapping.len(), 1);
    }
}
