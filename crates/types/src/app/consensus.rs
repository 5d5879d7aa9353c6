//! Wire entities for the round protocol, view change, and DKG (spec.md §3).

use std::collections::{BTreeMap, BTreeSet};

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::{AccountId, Txn};

/// A committee member's position within the current magic block, used to
/// index DKG shares and VRF/threshold-signature party identities.
pub type PartyId = u64;

/// A proposed or notarized block.
///
/// Mutable (by ticket merging) until notarized, then treated as immutable;
/// sharders persist it to the block store on finalization (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Block {
    pub round: u64,
    pub prev_hash: [u8; 32],
    pub hash: [u8; 32],
    pub miner_id: AccountId,
    /// The round random seed this block was proposed against.
    pub round_random_seed: i64,
    pub transactions: Vec<Txn>,
    /// Signers are deduplicated: at most one ticket per signer per block.
    pub verification_tickets: BTreeMap<AccountId, VerificationTicket>,
    /// Signature of `miner_id` over the block's content hash.
    pub signature: Vec<u8>,
    /// State root produced by executing `transactions` against `prev_hash`'s
    /// post-state (spec.md §4.2, §8 determinism property).
    pub state_root: [u8; 32],
}

impl Block {
    /// Number of distinct verified signers currently on the block.
    pub fn ticket_count(&self) -> usize {
        self.verification_tickets.len()
    }

    /// `true` once `threshold` distinct verified tickets have been merged.
    pub fn is_notarized(&self, threshold: usize) -> bool {
        self.ticket_count() >= threshold
    }
}

/// A signed attestation that a verifying miner accepted a proposed block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct VerificationTicket {
    pub block_hash: [u8; 32],
    pub signer: AccountId,
    pub signature: Vec<u8>,
}

/// A per-round VRF contribution from one committee member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct VrfShare {
    pub round: u64,
    pub party: PartyId,
    /// Round timeout count this share was signed under; bumping it on
    /// timeout makes each retry cryptographically distinct (spec.md §4.4).
    pub round_timeout_count: u32,
    /// BLS signature over the round/timeout-count message.
    pub share: Vec<u8>,
}

/// A committee specification governing a contiguous range of rounds
/// (spec.md §3, §4.6). Constructed by the view-change/DKG machine and
/// consulted by the round and chain machines for threshold checks.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct MagicBlock {
    pub number: u64,
    pub starting_round: u64,
    /// Ordered so that `PartyId` == index into this vector.
    pub miners: Vec<AccountId>,
    pub sharders: Vec<AccountId>,
    /// BLS signature threshold; `threshold <= miners.len()`.
    pub threshold: u32,
    /// The committee's aggregated BLS group public key.
    pub group_public_key: Vec<u8>,
}

impl MagicBlock {
    pub fn n(&self) -> usize {
        self.miners.len()
    }

    pub fn party_id_of(&self, account: &AccountId) -> Option<PartyId> {
        self.miners
            .iter()
            .position(|m| m == account)
            .map(|idx| idx as PartyId)
    }

    pub fn covers_round(&self, round: u64, next_starting_round: Option<u64>) -> bool {
        round >= self.starting_round && next_starting_round.map_or(true, |n| round < n)
    }
}

/// A single DKG key share sent from one party to another during the Share
/// phase (spec.md §4.6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct DkgKeyShare {
    pub from_party: PartyId,
    pub to_party: PartyId,
    /// Serialized BLS scalar (the share value).
    pub share: Vec<u8>,
    /// Signature of `from_party` over `share`.
    pub signature: Vec<u8>,
}

/// One party's SOSS (share-or-sign) publication: either the full set of
/// shares it received, keyed by sender, or a signed complaint that some
/// shares were missing or invalid.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub enum ShareOrSigns {
    /// The shares this party received from every other contributor.
    Shares(BTreeMap<PartyId, DkgKeyShare>),
    /// A signed complaint naming the parties whose shares were missing or
    /// failed verification.
    Complaint {
        missing_or_invalid: BTreeSet<PartyId>,
        signature: Vec<u8>,
    },
}
