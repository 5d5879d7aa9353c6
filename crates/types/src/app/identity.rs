//! Canonical account and chain identifiers.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

/// A genesis-determined identifier for a chain. Requests carrying a
/// mismatched `chain-id` header are dropped silently (spec.md §6).
#[derive(
    Encode, Decode, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default,
)]
#[serde(transparent)]
pub struct ChainId(pub u64);

/// A unique, stable identifier for an on-chain account or provider,
/// derived from the SHA3-256 hash of its public key.
#[derive(
    Encode, Decode, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// Derives the canonical `AccountId` from raw public-key material.
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(public_key);
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Self(out)
    }

    /// Returns the lowercase hex encoding, the textual form used in logs and
    /// on the wire for human-facing surfaces.
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountId({})", &self.to_hex()[..8])
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for AccountId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let a = AccountId::from_public_key(b"miner-1-pubkey");
        let b = AccountId::from_public_key(b"miner-1-pubkey");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_keys_give_distinct_ids() {
        let a = AccountId::from_public_key(b"miner-1");
        let b = AccountId::from_public_key(b"miner-2");
        assert_ne!(a, b);
    }
}
