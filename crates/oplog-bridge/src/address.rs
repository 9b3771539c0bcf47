// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Database addresses (`/<scheme>/<root descriptor CID>`).

use std::fmt;
use std::str::FromStr;

use oplog_cid::LocalCid;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::BridgeError;

/// Public address of a database, derived from its root descriptor CID.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DbAddress {
    scheme: String,
    root: LocalCid,
}

impl DbAddress {
    /// Address for `root` under `scheme`.
    pub fn new(scheme: &str, root: LocalCid) -> Self {
        Self {
            scheme: scheme.to_owned(),
            root,
        }
    }

    /// Parse `/<scheme>/<root>`. A trailing path segment (older addresses
    /// append the database name) is accepted and dropped.
    pub fn parse(text: &str) -> Result<Self, BridgeError> {
        let invalid = |reason: &str| BridgeError::InvalidAddress {
            input: text.to_owned(),
            reason: reason.to_owned(),
        };
        let mut segments = text.trim_start_matches('/').split('/');
        let scheme = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| invalid("missing scheme"))?;
        let root = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| invalid("missing root CID"))?;
        if segments.nth(1).is_some() {
            return Err(invalid("too many path segments"));
        }
        let root = LocalCid::parse(root).map_err(|err| invalid(&err.to_string()))?;
        Ok(Self::new(scheme, root))
    }

    /// Scheme segment.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Root descriptor CID.
    pub fn root(&self) -> LocalCid {
        self.root
    }
}

impl fmt::Display for DbAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.scheme, self.root)
    }
}

impl FromStr for DbAddress {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DbAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DbAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use oplog_cid::local_cid_of;

    #[test]
    fn display_and_parse_agree() {
        let root = local_cid_of(b"manifest").unwrap();
        let address = DbAddress::new("orbitdb", root);
        let text = address.to_string();
        assert_eq!(text, format!("/orbitdb/{root}"));
        assert_eq!(DbAddress::parse(&text).unwrap(), address);
    }

    #[test]
    fn trailing_name_segment_is_dropped() {
        let root = local_cid_of(b"manifest").unwrap();
        let parsed = DbAddress::parse(&format!("/orbitdb/{root}/events")).unwrap();
        assert_eq!(parsed.root(), root);
        assert_eq!(parsed.scheme(), "orbitdb");
    }

    #[test]
    fn malformed_addresses_are_rejected() {
        let root = local_cid_of(b"manifest").unwrap();
        for bad in [
            String::new(),
            "/orbitdb".to_owned(),
            "/orbitdb/".to_owned(),
            "/orbitdb/not-a-cid".to_owned(),
            format!("/orbitdb/{root}/name/extra"),
            format!("/orbitdb/{}", root.to_remote()),
        ] {
            assert!(
                matches!(DbAddress::parse(&bad), Err(BridgeError::InvalidAddress { .. })),
                "accepted {bad:?}"
            );
        }
    }
}
