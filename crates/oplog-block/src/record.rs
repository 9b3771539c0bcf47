// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Typed record shapes as written by the local log engine.
//!
//! Field names match the engine's wire names (`accessController`,
//! `publicKey`, `type`) so bytes written here classify the same way as
//! bytes written by the engine itself.

use ciborium::value::Value;
use oplog_cid::LocalCid;
use serde::{Deserialize, Serialize};

use crate::classify::PERMISSION_CONTROLLER_TAG;

/// Root descriptor: names a database and points at its permission record.
///
/// Holds nothing about entries or heads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Database name.
    pub name: String,
    /// Database type (e.g. `events`, `keyvalue`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Link to the permission descriptor, usually `/ipfs/<cid>`.
    #[serde(rename = "accessController")]
    pub access_controller: String,
    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl Manifest {
    /// Manifest without metadata.
    pub fn new(name: &str, kind: &str, access_controller: &str) -> Self {
        Self {
            name: name.to_owned(),
            kind: kind.to_owned(),
            access_controller: access_controller.to_owned(),
            meta: None,
        }
    }
}

/// Permission descriptor listing the identities allowed to append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControllerRecord {
    /// Controller type tag.
    #[serde(rename = "type")]
    pub kind: String,
    /// Identity ids with write access (`*` for anyone).
    pub write: Vec<String>,
}

impl AccessControllerRecord {
    /// Permission descriptor with the well-known controller tag.
    pub fn new(write: Vec<String>) -> Self {
        Self {
            kind: PERMISSION_CONTROLLER_TAG.to_owned(),
            write,
        }
    }
}

/// Signatures binding an identity id to its public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySignatures {
    /// Signature over the id.
    pub id: String,
    /// Signature over the public key.
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

/// Signer descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Identity id.
    pub id: String,
    /// Hex-encoded public key.
    #[serde(rename = "publicKey")]
    pub public_key: String,
    /// Binding signatures.
    pub signatures: IdentitySignatures,
    /// Signing scheme / provider type.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Operation carried by an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Operation kind (`ADD`, `PUT`, `DEL`).
    pub op: String,
    /// Key the operation targets, if any.
    #[serde(default)]
    pub key: Option<String>,
    /// Operation value.
    #[serde(default)]
    pub value: Option<Value>,
}

/// Lamport clock scoped to a signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    /// Signer-scoped clock id (the signer's public key).
    pub id: String,
    /// Counter.
    pub time: u64,
}

/// Log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    /// Entry format version.
    pub v: u64,
    /// Log id (the database address).
    pub id: String,
    /// Signer public key.
    pub key: String,
    /// Signature over the entry body.
    pub sig: String,
    /// Link to the signer descriptor.
    pub identity: LocalCid,
    /// Operation payload.
    pub payload: Payload,
    /// Successor links: entries that causally precede this one.
    pub next: Vec<LocalCid>,
    /// Skip links to older entries.
    #[serde(default)]
    pub refs: Vec<LocalCid>,
    /// Logical clock.
    pub clock: Clock,
}
