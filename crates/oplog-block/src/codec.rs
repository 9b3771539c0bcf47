// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! CBOR encoding for log records.

use ciborium::value::Value;
use serde::{de::DeserializeOwned, Serialize};

/// Errors raised while encoding or decoding record bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    /// Serialization to CBOR failed.
    #[error("[BLOCK_ENCODE] {0}")]
    Encode(String),
    /// Bytes were not valid CBOR for the requested shape.
    #[error("[BLOCK_DECODE] {0}")]
    Decode(String),
}

/// Encode a record to CBOR bytes. Field order follows the struct.
pub fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>, BlockError> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(record, &mut out)
        .map_err(|err| BlockError::Encode(err.to_string()))?;
    Ok(out)
}

/// Decode CBOR bytes into a typed record.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, BlockError> {
    ciborium::de::from_reader(bytes).map_err(|err| BlockError::Decode(err.to_string()))
}

/// Decode CBOR bytes into a generic value for shape inspection.
pub fn decode_value(bytes: &[u8]) -> Result<Value, BlockError> {
    decode(bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::record::{AccessControllerRecord, Manifest};

    #[test]
    fn typed_records_survive_cbor() {
        let ac = AccessControllerRecord::new(vec!["*".to_owned()]);
        let bytes = encode(&ac).unwrap();
        let back: AccessControllerRecord = decode(&bytes).unwrap();
        assert_eq!(back, ac);
    }

    #[test]
    fn encoding_is_deterministic() {
        let manifest = Manifest::new("db", "events", "/ipfs/zdpu");
        assert_eq!(encode(&manifest).unwrap(), encode(&manifest).unwrap());
    }

    #[test]
    fn decode_rejects_truncated_bytes() {
        let manifest = Manifest::new("db", "events", "/ipfs/zdpu");
        let bytes = encode(&manifest).unwrap();
        let err = decode_value(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, BlockError::Decode(_)));
    }
}
