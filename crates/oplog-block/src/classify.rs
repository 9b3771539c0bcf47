// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Field-shape classification of decoded blocks.
//!
//! The remote store attaches no type tag, so a block's role is inferred from
//! which fields it carries. Rules are tried in a fixed order and the first
//! match wins; a block is never reclassified by a later rule:
//!
//! 1. `name`, `type`, `accessController` → [`BlockCategory::RootDescriptor`]
//! 2. `sig`, `key`, `identity` → [`BlockCategory::LogEntry`]
//! 3. `id`, `type` → [`BlockCategory::SignerDescriptor`]
//! 4. `type == "ipfs"` → [`BlockCategory::PermissionDescriptor`]
//! 5. anything else → [`BlockCategory::Unrecognized`]
//!
//! Link fields may hold CID text (optionally `/ipfs/`-prefixed) or CBOR
//! tag-42 binary links; both decode to [`LocalCid`].

use std::fmt;

use ciborium::value::Value;
use oplog_cid::LocalCid;
use serde::{Deserialize, Serialize};

use crate::codec::decode_value;

/// Controller tag carried by permission descriptors.
pub const PERMISSION_CONTROLLER_TAG: &str = "ipfs";

const CBOR_LINK_TAG: u64 = 42;

/// Role of a block within a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCategory {
    /// Database manifest.
    RootDescriptor,
    /// Log entry.
    LogEntry,
    /// Identity / public key record.
    SignerDescriptor,
    /// Access controller record.
    PermissionDescriptor,
    /// No rule matched.
    Unrecognized,
}

impl BlockCategory {
    /// Stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RootDescriptor => "root_descriptor",
            Self::LogEntry => "log_entry",
            Self::SignerDescriptor => "signer_descriptor",
            Self::PermissionDescriptor => "permission_descriptor",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for BlockCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields of a root descriptor the bridge needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestView {
    /// Database name.
    pub name: String,
    /// Database type.
    pub kind: String,
    /// Permission descriptor link, `None` if the field is not a usable CID.
    pub access_controller: Option<LocalCid>,
}

/// Fields of a log entry the bridge needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryView {
    /// Log the entry belongs to (its `id` field), if present.
    pub log_id: Option<String>,
    /// Signer descriptor link.
    pub identity: Option<LocalCid>,
    /// Successor links. Unparseable links are dropped.
    pub next: Vec<LocalCid>,
    /// Skip links.
    pub refs: Vec<LocalCid>,
    /// Clock counter, if present.
    pub clock_time: Option<u64>,
}

/// Fields of a signer descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityView {
    /// Identity id.
    pub id: String,
    /// Identity type.
    pub kind: String,
}

/// Fields of a permission descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionView {
    /// Identities with write access.
    pub write: Vec<String>,
}

/// Outcome of classifying one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// Rule 1 matched.
    RootDescriptor(ManifestView),
    /// Rule 2 matched.
    LogEntry(EntryView),
    /// Rule 3 matched.
    SignerDescriptor(IdentityView),
    /// Rule 4 matched.
    PermissionDescriptor(PermissionView),
    /// No rule matched.
    Unrecognized,
}

impl Classified {
    /// The category of this outcome.
    pub fn category(&self) -> BlockCategory {
        match self {
            Self::RootDescriptor(_) => BlockCategory::RootDescriptor,
            Self::LogEntry(_) => BlockCategory::LogEntry,
            Self::SignerDescriptor(_) => BlockCategory::SignerDescriptor,
            Self::PermissionDescriptor(_) => BlockCategory::PermissionDescriptor,
            Self::Unrecognized => BlockCategory::Unrecognized,
        }
    }
}

/// Classify a decoded value.
pub fn classify(value: &Value) -> Classified {
    if let Some(view) = try_parse_root_descriptor(value) {
        return Classified::RootDescriptor(view);
    }
    if let Some(view) = try_parse_log_entry(value) {
        return Classified::LogEntry(view);
    }
    if let Some(view) = try_parse_signer_descriptor(value) {
        return Classified::SignerDescriptor(view);
    }
    if let Some(view) = try_parse_permission_descriptor(value) {
        return Classified::PermissionDescriptor(view);
    }
    Classified::Unrecognized
}

/// Decode and classify raw bytes. Undecodable bytes are `Unrecognized`.
pub fn classify_bytes(bytes: &[u8]) -> Classified {
    decode_value(bytes).map_or(Classified::Unrecognized, |value| classify(&value))
}

/// Rule 1.
pub fn try_parse_root_descriptor(value: &Value) -> Option<ManifestView> {
    let name = field(value, "name")?;
    let kind = field(value, "type")?;
    let access_controller = field(value, "accessController")?;
    Some(ManifestView {
        name: text_or_empty(name),
        kind: text_or_empty(kind),
        access_controller: parse_link(access_controller),
    })
}

/// Rule 2.
pub fn try_parse_log_entry(value: &Value) -> Option<EntryView> {
    field(value, "sig")?;
    field(value, "key")?;
    let identity = field(value, "identity")?;
    let clock_time = field(value, "clock")
        .and_then(|clock| field(clock, "time"))
        .and_then(Value::as_integer)
        .and_then(|time| u64::try_from(time).ok());
    Some(EntryView {
        log_id: field(value, "id").and_then(Value::as_text).map(str::to_owned),
        identity: parse_link(identity),
        next: links(field(value, "next")),
        refs: links(field(value, "refs")),
        clock_time,
    })
}

/// Rule 3.
pub fn try_parse_signer_descriptor(value: &Value) -> Option<IdentityView> {
    let id = field(value, "id")?;
    let kind = field(value, "type")?;
    Some(IdentityView {
        id: text_or_empty(id),
        kind: text_or_empty(kind),
    })
}

/// Rule 4.
pub fn try_parse_permission_descriptor(value: &Value) -> Option<PermissionView> {
    let kind = field(value, "type")?.as_text()?;
    if kind != PERMISSION_CONTROLLER_TAG {
        return None;
    }
    let write = field(value, "write")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_text)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();
    Some(PermissionView { write })
}

/// Decode a link held as CID text or a CBOR tag-42 binary CID.
pub fn parse_link(value: &Value) -> Option<LocalCid> {
    match value {
        Value::Text(text) => LocalCid::reframe(text).ok(),
        Value::Tag(CBOR_LINK_TAG, inner) => {
            let raw: &[u8] = inner.as_bytes()?;
            let cid = raw.strip_prefix(&[0u8]).unwrap_or(raw);
            LocalCid::from_bytes(cid).ok()
        }
        _ => None,
    }
}

fn links(value: Option<&Value>) -> Vec<LocalCid> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(parse_link).collect(),
        Some(single) => parse_link(single).into_iter().collect(),
        None => Vec::new(),
    }
}

fn field<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    value
        .as_map()?
        .iter()
        .find_map(|(key, val)| (key.as_text() == Some(name)).then_some(val))
}

fn text_or_empty(value: &Value) -> String {
    value.as_text().unwrap_or_default().to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::codec::encode;
    use crate::record::{
        AccessControllerRecord, Clock, EntryRecord, IdentityRecord, IdentitySignatures, Manifest,
        Payload,
    };
    use oplog_cid::local_cid_of;

    fn text(s: &str) -> Value {
        Value::Text(s.to_owned())
    }

    fn map(fields: &[(&str, Value)]) -> Value {
        Value::Map(
            fields
                .iter()
                .map(|(k, v)| (text(k), v.clone()))
                .collect(),
        )
    }

    fn sample_entry(next: Vec<LocalCid>) -> EntryRecord {
        EntryRecord {
            v: 2,
            id: "/orbitdb/zdpu".to_owned(),
            key: "04ab".to_owned(),
            sig: "3045".to_owned(),
            identity: local_cid_of(b"identity").unwrap(),
            payload: Payload {
                op: "ADD".to_owned(),
                key: None,
                value: Some(text("hello")),
            },
            next,
            refs: Vec::new(),
            clock: Clock {
                id: "04ab".to_owned(),
                time: 3,
            },
        }
    }

    #[test]
    fn manifest_classifies_as_root_descriptor() {
        let ac = local_cid_of(b"ac").unwrap();
        let bytes = encode(&Manifest::new("db", "events", &format!("/ipfs/{ac}"))).unwrap();
        match classify_bytes(&bytes) {
            Classified::RootDescriptor(view) => {
                assert_eq!(view.name, "db");
                assert_eq!(view.kind, "events");
                assert_eq!(view.access_controller, Some(ac));
            }
            other => unreachable!("expected root descriptor, got {other:?}"),
        }
    }

    #[test]
    fn root_rule_precedes_entry_rule() {
        let value = map(&[
            ("name", text("db")),
            ("type", text("events")),
            ("accessController", text("/ipfs/x")),
            ("sig", text("3045")),
            ("key", text("04ab")),
            ("identity", text("zdpu")),
        ]);
        assert_eq!(classify(&value).category(), BlockCategory::RootDescriptor);
    }

    #[test]
    fn entry_exposes_successor_links_and_identity() {
        let prev = local_cid_of(b"prev").unwrap();
        let entry = sample_entry(vec![prev]);
        let bytes = encode(&entry).unwrap();
        match classify_bytes(&bytes) {
            Classified::LogEntry(view) => {
                assert_eq!(view.next, vec![prev]);
                assert_eq!(view.identity, Some(entry.identity));
                assert_eq!(view.clock_time, Some(3));
                assert_eq!(view.log_id.as_deref(), Some("/orbitdb/zdpu"));
            }
            other => unreachable!("expected log entry, got {other:?}"),
        }
    }

    #[test]
    fn tag42_links_are_understood() {
        let prev = local_cid_of(b"prev").unwrap();
        let mut raw = vec![0u8];
        raw.extend(prev.as_cid().to_bytes());
        let link = Value::Tag(42, Box::new(Value::Bytes(raw)));
        let value = map(&[
            ("sig", text("s")),
            ("key", text("k")),
            ("identity", link.clone()),
            ("next", Value::Array(vec![link])),
        ]);
        match classify(&value) {
            Classified::LogEntry(view) => {
                assert_eq!(view.next, vec![prev]);
                assert_eq!(view.identity, Some(prev));
            }
            other => unreachable!("expected log entry, got {other:?}"),
        }
    }

    #[test]
    fn identity_classifies_as_signer_descriptor() {
        let identity = IdentityRecord {
            id: "user-1".to_owned(),
            public_key: "04ab".to_owned(),
            signatures: IdentitySignatures {
                id: "s1".to_owned(),
                public_key: "s2".to_owned(),
            },
            kind: "publickey".to_owned(),
        };
        let classified = classify_bytes(&encode(&identity).unwrap());
        assert_eq!(
            classified,
            Classified::SignerDescriptor(IdentityView {
                id: "user-1".to_owned(),
                kind: "publickey".to_owned(),
            })
        );
    }

    #[test]
    fn access_controller_classifies_as_permission_descriptor() {
        let ac = AccessControllerRecord::new(vec!["*".to_owned()]);
        let classified = classify_bytes(&encode(&ac).unwrap());
        assert_eq!(
            classified,
            Classified::PermissionDescriptor(PermissionView {
                write: vec!["*".to_owned()],
            })
        );
    }

    #[test]
    fn signer_rule_precedes_permission_rule() {
        let value = map(&[("id", text("x")), ("type", text(PERMISSION_CONTROLLER_TAG))]);
        assert_eq!(classify(&value).category(), BlockCategory::SignerDescriptor);
    }

    #[test]
    fn foreign_type_tag_is_unrecognized() {
        let value = map(&[("type", text("orbitdb")), ("write", Value::Array(vec![]))]);
        assert_eq!(classify(&value), Classified::Unrecognized);
    }

    #[test]
    fn non_map_and_garbage_are_unrecognized() {
        assert_eq!(classify(&text("just text")), Classified::Unrecognized);
        assert_eq!(classify_bytes(b"\xff\xff\xff"), Classified::Unrecognized);
        assert_eq!(classify_bytes(b""), Classified::Unrecognized);
    }

    #[test]
    fn category_names_are_stable() {
        assert_eq!(BlockCategory::LogEntry.to_string(), "log_entry");
        assert_eq!(
            serde_json::to_string(&BlockCategory::PermissionDescriptor).unwrap(),
            "\"permission_descriptor\""
        );
    }
}
