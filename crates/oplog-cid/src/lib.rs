// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Content identifier forms for oplog-vault.
//!
//! The local log engine and the remote block store address the same bytes
//! with different CID framing:
//!
//! | side   | version | codec    | text base        | example prefix |
//! |--------|---------|----------|------------------|----------------|
//! | local  | v1      | dag-cbor | base58btc (`z`)  | `zdpu…`        |
//! | remote | v1      | raw      | base32 (`b`)     | `bafkrei…`     |
//!
//! Both sides hash with sha2-256, so the multihash (digest plus hash tag) is
//! identical and only the framing differs. [`LocalCid`] and [`RemoteCid`]
//! keep the two forms apart in the type system; [`translate`] offers the
//! string-level conversions.
//!
//! # Digest Invariant
//!
//! Translation never touches the multihash. `local.to_remote().to_local()`
//! is the identity, and `local.digest() == local.to_remote().digest()`.
#![forbid(unsafe_code)]

pub mod translate;

pub use translate::{to_local_form, to_remote_form};

use cid::multibase::Base;
use cid::{Cid, Version};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::str::FromStr;

/// Multihash with the default 64-byte digest capacity.
pub type Multihash = cid::multihash::Multihash<64>;

/// Multicodec tag for dag-cbor (local records).
pub const LOCAL_CODEC: u64 = 0x71;
/// Multicodec tag for raw bytes (remote blocks).
pub const REMOTE_CODEC: u64 = 0x55;
/// Multihash tag for sha2-256.
pub const SHA2_256: u64 = 0x12;

const LOCAL_BASE_PREFIX: char = 'z';
const REMOTE_BASE_PREFIX: char = 'b';

/// Errors raised while parsing or building identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CidError {
    /// Input text is not a usable identifier for the requested form.
    #[error("[CID_MALFORMED] {input:?}: {reason}")]
    MalformedIdentifier {
        /// The offending input text.
        input: String,
        /// Why the input was rejected.
        reason: String,
    },
    /// A digest could not be wrapped into a multihash.
    #[error("[CID_DIGEST] {0}")]
    UnsupportedDigest(String),
}

impl CidError {
    fn malformed(input: &str, reason: impl fmt::Display) -> Self {
        Self::MalformedIdentifier {
            input: input.to_owned(),
            reason: reason.to_string(),
        }
    }
}

/// Compute the sha2-256 multihash of `bytes`.
pub fn sha256_multihash(bytes: &[u8]) -> Result<Multihash, CidError> {
    let digest = Sha256::digest(bytes);
    Multihash::wrap(SHA2_256, digest.as_slice())
        .map_err(|err| CidError::UnsupportedDigest(err.to_string()))
}

/// Local CID of `bytes` (dag-cbor framing).
pub fn local_cid_of(bytes: &[u8]) -> Result<LocalCid, CidError> {
    Ok(LocalCid::from_multihash(sha256_multihash(bytes)?))
}

/// Remote CID of `bytes` (raw framing), as the remote store would compute it.
pub fn remote_cid_of(bytes: &[u8]) -> Result<RemoteCid, CidError> {
    Ok(RemoteCid::from_multihash(sha256_multihash(bytes)?))
}

fn parse_any(text: &str) -> Result<Cid, CidError> {
    Cid::try_from(text).map_err(|err| CidError::malformed(text, err))
}

fn require_sha256(text: &str, cid: &Cid) -> Result<(), CidError> {
    let code = cid.hash().code();
    if code == SHA2_256 {
        Ok(())
    } else {
        Err(CidError::malformed(
            text,
            format_args!("unsupported hash function 0x{code:x}"),
        ))
    }
}

/// Identifier in the local log engine's form (CIDv1, dag-cbor, base58btc).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalCid(Cid);

impl LocalCid {
    /// Parse the canonical local text form.
    pub fn parse(text: &str) -> Result<Self, CidError> {
        if !text.starts_with(LOCAL_BASE_PREFIX) {
            return Err(CidError::malformed(
                text,
                "local identifiers use the base58btc `z` prefix",
            ));
        }
        let cid = parse_any(text)?;
        if cid.version() != Version::V1 {
            return Err(CidError::malformed(text, "local identifiers are CIDv1"));
        }
        if cid.codec() != LOCAL_CODEC {
            return Err(CidError::malformed(
                text,
                format_args!("expected dag-cbor codec, found 0x{:x}", cid.codec()),
            ));
        }
        require_sha256(text, &cid)?;
        Ok(Self(cid))
    }

    /// Reframe any sha2-256 CID into the local form.
    pub fn from_cid(cid: &Cid) -> Result<Self, CidError> {
        require_sha256(&cid.to_string(), cid)?;
        Ok(Self::from_multihash(*cid.hash()))
    }

    /// Reframe CID text of any base, codec or version into the local form.
    ///
    /// A leading `/ipfs/` path segment is tolerated, as records often store
    /// links in path form.
    pub fn reframe(text: &str) -> Result<Self, CidError> {
        let bare = text.strip_prefix("/ipfs/").unwrap_or(text);
        Self::from_cid(&parse_any(bare)?)
    }

    /// Decode a binary CID (the payload of a CBOR tag-42 link, without the
    /// leading identity-multibase `0x00`).
    pub fn from_bytes(raw: &[u8]) -> Result<Self, CidError> {
        let cid = Cid::try_from(raw).map_err(|err| CidError::malformed("<binary cid>", err))?;
        Self::from_cid(&cid)
    }

    /// Build the local form around an existing multihash.
    pub fn from_multihash(hash: Multihash) -> Self {
        Self(Cid::new_v1(LOCAL_CODEC, hash))
    }

    /// Convert to the remote form. The multihash is carried over untouched.
    pub fn to_remote(&self) -> RemoteCid {
        RemoteCid::from_multihash(*self.0.hash())
    }

    /// The raw digest bytes.
    pub fn digest(&self) -> &[u8] {
        self.0.hash().digest()
    }

    /// The underlying CID.
    pub fn as_cid(&self) -> &Cid {
        &self.0
    }
}

impl fmt::Display for LocalCid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .0
            .to_string_of_base(Base::Base58Btc)
            .map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl fmt::Debug for LocalCid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalCid({self})")
    }
}

impl FromStr for LocalCid {
    type Err = CidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Identifier in the remote store's form (CIDv1, raw, base32).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RemoteCid(Cid);

impl RemoteCid {
    /// Parse the canonical remote text form.
    pub fn parse(text: &str) -> Result<Self, CidError> {
        if !text.starts_with(REMOTE_BASE_PREFIX) {
            return Err(CidError::malformed(
                text,
                "remote identifiers use the base32 `b` prefix",
            ));
        }
        let cid = parse_any(text)?;
        if cid.version() != Version::V1 {
            return Err(CidError::malformed(text, "remote identifiers are CIDv1"));
        }
        if cid.codec() != REMOTE_CODEC {
            return Err(CidError::malformed(
                text,
                format_args!("expected raw codec, found 0x{:x}", cid.codec()),
            ));
        }
        require_sha256(text, &cid)?;
        Ok(Self(cid))
    }

    /// Reframe any sha2-256 CID into the remote form.
    pub fn from_cid(cid: &Cid) -> Result<Self, CidError> {
        require_sha256(&cid.to_string(), cid)?;
        Ok(Self::from_multihash(*cid.hash()))
    }

    /// Build the remote form around an existing multihash.
    pub fn from_multihash(hash: Multihash) -> Self {
        Self(Cid::new_v1(REMOTE_CODEC, hash))
    }

    /// Convert to the local form. The multihash is carried over untouched.
    pub fn to_local(&self) -> LocalCid {
        LocalCid::from_multihash(*self.0.hash())
    }

    /// The raw digest bytes.
    pub fn digest(&self) -> &[u8] {
        self.0.hash().digest()
    }

    /// The underlying CID.
    pub fn as_cid(&self) -> &Cid {
        &self.0
    }
}

impl fmt::Display for RemoteCid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .0
            .to_string_of_base(Base::Base32Lower)
            .map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl fmt::Debug for RemoteCid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RemoteCid({self})")
    }
}

impl FromStr for RemoteCid {
    type Err = CidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

macro_rules! serde_as_text {
    ($ty:ty) => {
        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = <String as serde::Deserialize>::deserialize(deserializer)?;
                Self::parse(&text).map_err(serde::de::Error::custom)
            }
        }
    };
}

serde_as_text!(LocalCid);
serde_as_text!(RemoteCid);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn local_text_uses_base58_prefix() {
        let cid = local_cid_of(b"entry bytes").unwrap();
        let text = cid.to_string();
        assert!(text.starts_with("zdpu"), "unexpected local text {text}");
        assert_eq!(LocalCid::parse(&text).unwrap(), cid);
    }

    #[test]
    fn remote_text_uses_base32_prefix() {
        let cid = remote_cid_of(b"entry bytes").unwrap();
        let text = cid.to_string();
        assert!(text.starts_with("bafkrei"), "unexpected remote text {text}");
        assert_eq!(RemoteCid::parse(&text).unwrap(), cid);
    }

    #[test]
    fn same_bytes_share_a_digest_across_forms() {
        let local = local_cid_of(b"same bytes").unwrap();
        let remote = remote_cid_of(b"same bytes").unwrap();
        assert_eq!(local.digest(), remote.digest());
        assert_eq!(local.to_remote(), remote);
        assert_eq!(remote.to_local(), local);
        assert_eq!(local.digest().len(), 32);
    }

    #[test]
    fn local_parse_rejects_remote_text() {
        let remote = remote_cid_of(b"x").unwrap().to_string();
        let err = LocalCid::parse(&remote).unwrap_err();
        assert!(matches!(err, CidError::MalformedIdentifier { .. }));
    }

    #[test]
    fn remote_parse_rejects_local_text() {
        let local = local_cid_of(b"x").unwrap().to_string();
        assert!(RemoteCid::parse(&local).is_err());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(LocalCid::parse("zNotReallyACid").is_err());
        assert!(RemoteCid::parse("").is_err());
        assert!(LocalCid::parse("").is_err());
    }

    #[test]
    fn local_parse_rejects_raw_codec_in_base58() {
        let raw = remote_cid_of(b"x").unwrap();
        let text = raw.as_cid().to_string_of_base(Base::Base58Btc).unwrap();
        let err = LocalCid::parse(&text).unwrap_err();
        assert!(err.to_string().contains("dag-cbor"));
    }

    #[test]
    fn reframe_accepts_path_and_other_bases() {
        let cid = local_cid_of(b"link").unwrap();
        let path = format!("/ipfs/{cid}");
        assert_eq!(LocalCid::reframe(&path).unwrap(), cid);
        let base32 = cid.as_cid().to_string();
        assert_eq!(LocalCid::reframe(&base32).unwrap(), cid);
        let remote = cid.to_remote().to_string();
        assert_eq!(LocalCid::reframe(&remote).unwrap(), cid);
    }

    #[test]
    fn from_bytes_decodes_binary_links() {
        let cid = local_cid_of(b"binary link").unwrap();
        let raw = cid.as_cid().to_bytes();
        assert_eq!(LocalCid::from_bytes(&raw).unwrap(), cid);
        assert!(LocalCid::from_bytes(&[0xff, 0x00]).is_err());
    }

    #[test]
    fn serde_uses_text_form() {
        let cid = local_cid_of(b"serde").unwrap();
        let json = serde_json::to_string(&cid).unwrap();
        assert_eq!(json, format!("\"{cid}\""));
        let back: LocalCid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cid);
    }
}
