//! The canonical wire codec (spec.md §6) and the internal canonical codec
//! used for content-addressed trie nodes.
//!
//! On-wire entities are encoded with either MessagePack or JSON, selected by
//! a per-request `codec` header. Determinism — required so that a
//! content-addressed block hash is reproducible across nodes — comes from
//! requiring every map-typed field in a wire entity to be a `BTreeMap` (or
//! `BTreeSet`): both `rmp-serde` and `serde_json` serialize a `BTreeMap` in
//! its iteration order, which is already lexicographic by key. This mirrors
//! the property the spec calls "maps are emitted with keys sorted
//! lexicographically," without needing a custom serializer.
//!
//! Trie-node encoding is a separate concern (internal only, never sent over
//! the wire) and uses `parity-scale-codec`, which is compact and equally
//! deterministic; mixing the two would not violate determinism, but keeping
//! them apart keeps "what a peer can decode" and "what only this node's
//! trie needs" from leaking into each other.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::error::ErrorCode;

/// The wire codec selected for a request, carried in the `codec` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// The canonical MessagePack encoding.
    MsgPack,
    /// The transitional JSON encoding.
    Json,
}

/// Errors from encoding or decoding a wire entity.
#[derive(Error, Debug)]
pub enum WireError {
    /// MessagePack encoding failed.
    #[error("msgpack encode failed: {0}")]
    MsgPackEncode(String),
    /// MessagePack decoding failed.
    #[error("msgpack decode failed: {0}")]
    MsgPackDecode(String),
    /// JSON encoding failed.
    #[error("json encode failed: {0}")]
    JsonEncode(String),
    /// JSON decoding failed.
    #[error("json decode failed: {0}")]
    JsonDecode(String),
}

impl ErrorCode for WireError {
    fn code(&self) -> &'static str {
        match self {
            Self::MsgPackEncode(_) => "WIRE_MSGPACK_ENCODE",
            Self::MsgPackDecode(_) => "WIRE_MSGPACK_DECODE",
            Self::JsonEncode(_) => "WIRE_JSON_ENCODE",
            Self::JsonDecode(_) => "WIRE_JSON_DECODE",
        }
    }
}

/// Encodes `value` under the given wire codec.
pub fn to_wire<T: Serialize>(value: &T, codec: Codec) -> Result<Vec<u8>, WireError> {
    match codec {
        Codec::MsgPack => {
            rmp_serde::to_vec_named(value).map_err(|e| WireError::MsgPackEncode(e.to_string()))
        }
        Codec::Json => {
            serde_json::to_vec(value).map_err(|e| WireError::JsonEncode(e.to_string()))
        }
    }
}

/// Decodes a value previously produced by [`to_wire`] under the given codec.
pub fn from_wire<T: DeserializeOwned>(bytes: &[u8], codec: Codec) -> Result<T, WireError> {
    match codec {
        Codec::MsgPack => {
            rmp_serde::from_slice(bytes).map_err(|e| WireError::MsgPackDecode(e.to_string()))
        }
        Codec::Json => {
            serde_json::from_slice(bytes).map_err(|e| WireError::JsonDecode(e.to_string()))
        }
    }
}

/// Encodes a value into the canonical, deterministic internal byte
/// representation used for content-addressed trie nodes.
///
/// This must never be used for on-wire entities: see the module doc.
pub fn to_bytes_canonical<T: parity_scale_codec::Encode>(value: &T) -> Vec<u8> {
    value.encode()
}

/// Decodes a value from the canonical internal byte representation.
pub fn from_bytes_canonical<T: parity_scale_codec::Decode>(
    bytes: &[u8],
) -> Result<T, WireError> {
    T::decode(&mut &*bytes).map_err(|e| WireError::MsgPackDecode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Debug, Serialize, serde::Deserialize, PartialEq, Eq)]
    struct Sample {
        fields: BTreeMap<String, u64>,
        name: String,
    }

    #[test]
    fn msgpack_roundtrip() {
        let mut fields = BTreeMap::new();
        fields.insert("z".to_string(), 1);
        fields.insert("a".to_string(), 2);
        let sample = Sample {
            fields,
            name: "alloc".into(),
        };
        let bytes = to_wire(&sample, Codec::MsgPack).expect("encode");
        let decoded: Sample = from_wire(&bytes, Codec::MsgPack).expect("decode");
        assert_eq!(sample, decoded);
    }

    #[test]
    fn json_roundtrip() {
        let mut fields = BTreeMap::new();
        fields.insert("b".to_string(), 3);
        let sample = Sample {
            fields,
            name: "blobber".into(),
        };
        let bytes = to_wire(&sample, Codec::Json).expect("encode");
        let decoded: Sample = from_wire(&bytes, Codec::Json).expect("decode");
        assert_eq!(sample, decoded);
    }

    #[test]
    fn msgpack_key_order_is_deterministic_across_insertion_order() {
        let mut a = BTreeMap::new();
        a.insert("y".to_string(), 1u64);
        a.insert("x".to_string(), 2u64);
        let mut b = BTreeMap::new();
        b.insert("x".to_string(), 2u64);
        b.insert("y".to_string(), 1u64);
        let sa = Sample {
            fields: a,
            name: "n".into(),
        };
        let sb = Sample {
            fields: b,
            name: "n".into(),
        };
        assert_eq!(
            to_wire(&sa, Codec::MsgPack).expect("a"),
            to_wire(&sb, Codec::MsgPack).expect("b")
        );
    }
}
