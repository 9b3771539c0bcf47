// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! String-level translation between local and remote identifier forms.
//!
//! Each function takes the canonical text of its source form and emits the
//! canonical text of the other, so `to_local_form(to_remote_form(x)) == x`
//! for every input either accepts. Anything else, a CIDv0, another codec or
//! text already in the target form, is malformed input. Use
//! [`LocalCid::reframe`] to coerce arbitrary CID text.

use crate::{CidError, LocalCid, RemoteCid};

/// Rebuild local-form `local` in the remote store's form.
pub fn to_remote_form(local: &str) -> Result<String, CidError> {
    Ok(LocalCid::parse(local)?.to_remote().to_string())
}

/// Rebuild remote-form `remote` in the local engine's form.
pub fn to_local_form(remote: &str) -> Result<String, CidError> {
    Ok(RemoteCid::parse(remote)?.to_local().to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{local_cid_of, remote_cid_of};

    #[test]
    fn round_trip_is_exact() {
        let local = local_cid_of(b"{\"name\":\"db\"}").unwrap().to_string();
        let remote = to_remote_form(&local).unwrap();
        assert_ne!(remote, local);
        assert_eq!(to_local_form(&remote).unwrap(), local);
    }

    #[test]
    fn remote_form_matches_store_computed_cid() {
        let bytes = b"block payload";
        let local = local_cid_of(bytes).unwrap().to_string();
        let expected = remote_cid_of(bytes).unwrap().to_string();
        assert_eq!(to_remote_form(&local).unwrap(), expected);
    }

    #[test]
    fn input_outside_the_source_form_is_rejected() {
        let remote = remote_cid_of(b"abc").unwrap().to_string();
        assert!(matches!(
            to_remote_form(&remote),
            Err(CidError::MalformedIdentifier { .. })
        ));
        let local = local_cid_of(b"abc").unwrap().to_string();
        assert!(matches!(
            to_local_form(&local),
            Err(CidError::MalformedIdentifier { .. })
        ));
        // CIDv0, dag-pb
        let v0 = "QmdfTbBqBPQ7VNxZEYEj14VmRuZBkqFbiwReogJgS1zR1n";
        assert!(matches!(
            to_remote_form(v0),
            Err(CidError::MalformedIdentifier { .. })
        ));
        assert!(LocalCid::reframe(v0).is_ok());
    }

    #[test]
    fn malformed_input_is_reported() {
        let err = to_remote_form("not-a-cid").unwrap_err();
        match err {
            CidError::MalformedIdentifier { input, .. } => assert_eq!(input, "not-a-cid"),
            other @ CidError::UnsupportedDigest(_) => {
                unreachable!("unexpected error {other}")
            }
        }
        assert!(to_local_form("").is_err());
    }
}
