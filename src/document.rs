//! Session serialization. [`Document`] is a serde DTO capturing everything
//! [`crate::engine::DoubleRatchet::serialize`] needs to hand the application
//! a session that can later be reconstructed with
//! [`crate::engine::DoubleRatchet::deserialize`] into a semantically
//! identical engine.
//!
//! The teacher's `utils.rs` serializes individual key types through a
//! per-type `to_base64`/`TryFrom<String>` pair; that doesn't scale to a
//! whole-session document with optional sub-chains and a variable-length
//! skipped-key map, so this crate uses one `serde`-derived struct instead,
//! keeping the same base64 encoding for every opaque byte field.

use serde::{Deserialize, Serialize};

use crate::errors::RatchetError;

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Vec<u8>, s: S) -> Result<S::Ok, S::Error> {
        base64::engine::general_purpose::STANDARD
            .encode(bytes)
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}

/// A single constant-input KDF sub-chain's persisted state: its current
/// chain key and step counter. The domain-separation labels are not stored
/// here — they come back from the [`crate::config::RatchetConfig`] supplied
/// to `deserialize`, so a document is only portable across sessions built
/// with matching configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct SubChainDocument {
    #[serde(with = "base64_bytes")]
    pub chain_key: Vec<u8>,
    pub length: u64,
}

/// One skipped-key-store entry.
#[derive(Clone, Serialize, Deserialize)]
pub struct SkippedKeyDocument {
    #[serde(with = "base64_bytes")]
    pub remote_public: Vec<u8>,
    pub n: u64,
    #[serde(with = "base64_bytes")]
    pub message_key: Vec<u8>,
}

/// The full opaque session document: root chain state, both sub-chains
/// (each optional, mirroring the engine's own `Option`s), the `Ns`/`Nr`/`PN`
/// counters, the own ratchet key pair (private key included — see the
/// at-rest protection note on [`crate::engine::DoubleRatchet::serialize`]),
/// the last-seen peer public if any, and the skipped-key store contents.
///
/// Unknown fields present in a document produced by a newer version of this
/// crate are ignored on deserialize (serde's default struct behavior);
/// fields this crate knows about but a document omits fail deserialization,
/// since every field here is mandatory to reconstruct engine state.
#[derive(Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(with = "base64_bytes")]
    pub root_chain_key: Vec<u8>,
    pub root_chain_length: u64,

    pub sending_chain: Option<SubChainDocument>,
    pub receiving_chain: Option<SubChainDocument>,

    pub ns: u64,
    pub nr: u64,
    pub pn: u64,

    #[serde(with = "base64_bytes")]
    pub own_private_key: Vec<u8>,
    #[serde(with = "base64_bytes", default)]
    pub other_public_key: Vec<u8>,
    pub has_other_public_key: bool,

    pub skipped: Vec<SkippedKeyDocument>,
}

impl Document {
    pub fn to_json(&self) -> Result<String, RatchetError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self, RatchetError> {
        Ok(serde_json::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_round_trips_through_json() {
        let doc = Document {
            root_chain_key: vec![1; 32],
            root_chain_length: 4,
            sending_chain: Some(SubChainDocument { chain_key: vec![2; 32], length: 7 }),
            receiving_chain: None,
            ns: 7,
            nr: 0,
            pn: 3,
            own_private_key: vec![3; 32],
            other_public_key: vec![4; 32],
            has_other_public_key: true,
            skipped: vec![SkippedKeyDocument {
                remote_public: vec![5; 32],
                n: 2,
                message_key: vec![6; 32],
            }],
        };

        let json = doc.to_json().unwrap();
        let decoded = Document::from_json(&json).unwrap();
        assert_eq!(decoded.root_chain_key, doc.root_chain_key);
        assert_eq!(decoded.ns, doc.ns);
        assert!(decoded.sending_chain.is_some());
        assert!(decoded.receiving_chain.is_none());
        assert_eq!(decoded.skipped.len(), 1);
    }

    #[test]
    fn malformed_json_fails_with_json_error() {
        let err = Document::from_json("not json");
        assert!(matches!(err, Err(RatchetError::JsonError(_))));
    }
}
