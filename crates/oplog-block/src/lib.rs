// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Record shapes, CBOR codec and field-shape classifier for log blocks.
//!
//! A snapshot is made of four record kinds (root descriptor, log entry,
//! signer descriptor, permission descriptor). [`record`] holds their typed
//! forms, [`codec`] moves them to and from CBOR bytes, and [`classify`]
//! recovers a block's role from its decoded shape alone, since the remote
//! store keeps no type tag.
#![forbid(unsafe_code)]

pub mod classify;
pub mod codec;
pub mod record;

pub use classify::{
    classify, classify_bytes, parse_link, BlockCategory, Classified, EntryView, IdentityView,
    ManifestView, PermissionView, PERMISSION_CONTROLLER_TAG,
};
pub use codec::{decode, decode_value, encode, BlockError};
pub use record::{
    AccessControllerRecord, Clock, EntryRecord, IdentityRecord, IdentitySignatures, Manifest,
    Payload,
};
