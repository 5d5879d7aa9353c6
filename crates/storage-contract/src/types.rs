//! Wire types for the storage-service contract's allocation and challenge
//! sub-state machines (spec.md §4.7).

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use meridian_types::app::{AccountId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum AllocationStatus {
    Created,
    Active,
    Closed,
    Cancelled,
    Finalized,
}

/// A client's storage allocation: the data/parity shard layout, the
/// blobbers carrying it, and the pricing/timing parameters governing
/// min-lock-demand (spec.md §4.7.1).
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct Allocation {
    pub id: String,
    pub owner: AccountId,
    pub data_shards: u32,
    pub parity_shards: u32,
    pub size: u64,
    pub expiration: Timestamp,
    pub write_price: u128,
    pub read_price: u128,
    pub challenge_completion_time: i64,
    pub blobbers: Vec<AccountId>,
    pub status: AllocationStatus,
}

impl Allocation {
    pub fn shard_count(&self) -> u32 {
        self.data_shards + self.parity_shards
    }

    pub fn size_per_blobber(&self) -> u64 {
        if self.shard_count() == 0 {
            0
        } else {
            self.size / u64::from(self.shard_count())
        }
    }
}

/// Per-blobber accounting within one allocation: how much of its
/// min-lock-demand it has been paid via challenge rewards, and its
/// reported used capacity (feeds challenge-ready blobber selection).
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct BlobberAllocation {
    pub allocation_id: String,
    pub blobber_id: AccountId,
    pub min_lock_demand: u128,
    pub spent: u128,
    pub used_capacity: u64,
    /// Timestamp of the last challenge this entry was credited for, the
    /// `prev_complete` anchor in the `dtu`/`rdtu` settlement math
    /// (spec.md §4.7.2).
    pub last_redeemed: Timestamp,
}

impl BlobberAllocation {
    /// The proportional drain for one challenge settlement: the blobber's
    /// outstanding entitlement scaled by the elapsed fraction of the
    /// allocation's remaining duration (spec.md §4.7.2's `challenge(dtu,
    /// rdtu)`).
    pub fn challenge(&self, dtu: f64, rdtu: f64) -> u128 {
        if rdtu <= 0.0 {
            return 0;
        }
        let fraction = (dtu / rdtu).clamp(0.0, 1.0);
        let remaining = self.min_lock_demand.saturating_sub(self.spent);
        ((remaining as f64) * fraction) as u128
    }
}

/// A client's deposit funding blobber payments for an allocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Encode, Decode)]
pub struct WritePool {
    pub balance: u128,
}

/// A client's deposit funding read-price payments.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Encode, Decode)]
pub struct ReadPool {
    pub balance: u128,
}

/// Escrow for in-flight challenge settlements on one allocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Encode, Decode)]
pub struct ChallengePool {
    pub balance: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum ChallengeStatus {
    Open,
    Passed,
    Failed,
    Expired,
}

/// One issued storage challenge (spec.md §4.7.2).
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct StorageChallenge {
    pub id: String,
    pub allocation_id: String,
    pub blobber_id: AccountId,
    pub validators: Vec<AccountId>,
    pub created: Timestamp,
    pub status: ChallengeStatus,
}

/// A validator's signed pass/fail attestation on a challenge response.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct ValidationTicket {
    pub challenge_id: String,
    pub validator_id: AccountId,
    pub passed: bool,
    pub signature: Vec<u8>,
}

/// An entry in the challenge-ready/blobber partitioned sets: enough to
/// drive weighted-by-used-capacity selection without a second lookup
/// (spec.md §4.7.2 step 2).
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct BlobberPartitionEntry {
    pub blobber_id: AccountId,
    pub used_capacity: u64,
}
