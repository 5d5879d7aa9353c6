//! Fact-based misbehavior reporting, shared by the consensus layer
//! (byzantine observations, spec.md §7) and the storage stake pool
//! (challenge-failure slashing, spec.md §4.7.2).
//!
//! Facts are kept separate from proof so that the same offense cannot be
//! penalized twice under two different, equally valid proofs: the
//! deterministic `offense_id` is derived only from the facts.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use super::AccountId;

/// The category of misbehavior being reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum OffenseType {
    /// A verification ticket or VRF share carried an invalid signature.
    InvalidSignature,
    /// The same signer produced two distinct verification tickets (or VRF
    /// shares) for the same round.
    Equivocation,
    /// A storage challenge response failed verification (spec.md §4.7.2).
    FailedChallenge,
}

/// The minimal, canonical facts identifying an offense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct OffenseFacts {
    pub offender: AccountId,
    pub offense_type: OffenseType,
    /// Round or challenge identifier the offense occurred at, interpreted
    /// per `offense_type`.
    pub context_id: [u8; 32],
}

/// A report of misbehavior carrying both the canonical facts and whatever
/// opaque proof backs them.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct OffenseReport {
    pub facts: OffenseFacts,
    /// Supporting evidence (signed messages, ticket bytes, ...). Excluded
    /// from `offense_id` so replay protection does not depend on which
    /// valid proof was submitted.
    pub proof: Vec<u8>,
}

/// Derives the deterministic, replay-protection identifier for an offense
/// from its canonical facts alone.
pub fn offense_id(facts: &OffenseFacts) -> [u8; 32] {
    let encoded = facts.encode();
    let mut hasher = Sha3_256::new();
    hasher.update(&encoded);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offense_id_ignores_proof() {
        let facts = OffenseFacts {
            offender: AccountId::from_public_key(b"blobber-1"),
            offense_type: OffenseType::FailedChallenge,
            context_id: [7u8; 32],
        };
        let a = OffenseReport {
            facts: facts.clone(),
            proof: vec![1, 2, 3],
        };
        let b = OffenseReport {
            facts,
            proof: vec![9, 9, 9, 9],
        };
        assert_eq!(offense_id(&a.facts), offense_id(&b.facts));
    }
}
