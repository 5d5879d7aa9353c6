//! Canonical trie-key builders for every entity family persisted in the MPT.
//!
//! Centralizing prefixes here (rather than inlining `b"alloc:"` at each call
//! site, as the teacher's `provider_registry` module does for its own two
//! prefixes) keeps the storage-contract and stake crates from silently
//! drifting apart on a key layout they both need to agree on.

use crate::app::AccountId;

const BALANCE_PREFIX: &[u8] = b"balance:";
const ALLOCATION_PREFIX: &[u8] = b"alloc:";
const BLOBBER_ALLOCATION_PREFIX: &[u8] = b"blobber_alloc:";
const STAKE_POOL_PREFIX: &[u8] = b"stake_pool:";
const WRITE_POOL_PREFIX: &[u8] = b"write_pool:";
const READ_POOL_PREFIX: &[u8] = b"read_pool:";
const CHALLENGE_POOL_PREFIX: &[u8] = b"challenge_pool:";
const CHALLENGE_PREFIX: &[u8] = b"challenge:";
const ALLOCATION_CHALLENGE_QUEUE_PREFIX: &[u8] = b"alloc_challenges:";
const BLOBBER_CHALLENGE_QUEUE_PREFIX: &[u8] = b"blobber_challenges:";
/// Canonical `PartitionedSet` name for challenge-ready blobbers.
pub const CHALLENGE_READY_PARTITION: &str = "challenge_ready";
/// Canonical `PartitionedSet` name for registered blobbers.
pub const BLOBBER_PARTITION: &str = "blobbers";
/// Canonical `PartitionedSet` name for registered validators.
pub const VALIDATOR_PARTITION: &str = "validators";

/// Key for an account's fungible token balance.
pub fn balance_key(account_id: &AccountId) -> Vec<u8> {
    [BALANCE_PREFIX, account_id.as_ref()].concat()
}

/// Key for an `Allocation` by its id.
pub fn allocation_key(allocation_id: &str) -> Vec<u8> {
    [ALLOCATION_PREFIX, allocation_id.as_bytes()].concat()
}

/// Key for a `BlobberAllocation` scoped to one blobber within one
/// allocation.
pub fn blobber_allocation_key(allocation_id: &str, blobber_id: &AccountId) -> Vec<u8> {
    [
        BLOBBER_ALLOCATION_PREFIX,
        allocation_id.as_bytes(),
        b":",
        blobber_id.as_ref(),
    ]
    .concat()
}

/// Key for a provider's (blobber, validator, or miner) stake pool.
pub fn stake_pool_key(provider_id: &AccountId) -> Vec<u8> {
    [STAKE_POOL_PREFIX, provider_id.as_ref()].concat()
}

/// Key for a client's write pool.
pub fn write_pool_key(client_id: &AccountId) -> Vec<u8> {
    [WRITE_POOL_PREFIX, client_id.as_ref()].concat()
}

/// Key for a client's read pool.
pub fn read_pool_key(client_id: &AccountId) -> Vec<u8> {
    [READ_POOL_PREFIX, client_id.as_ref()].concat()
}

/// Key for an allocation's challenge pool.
pub fn challenge_pool_key(allocation_id: &str) -> Vec<u8> {
    [CHALLENGE_POOL_PREFIX, allocation_id.as_bytes()].concat()
}

/// Key for a single `StorageChallenge` by id.
pub fn challenge_key(challenge_id: &str) -> Vec<u8> {
    [CHALLENGE_PREFIX, challenge_id.as_bytes()].concat()
}

/// Key for the FIFO queue of open challenge ids on one allocation.
pub fn allocation_challenge_queue_key(allocation_id: &str) -> Vec<u8> {
    [ALLOCATION_CHALLENGE_QUEUE_PREFIX, allocation_id.as_bytes()].concat()
}

/// Key for the FIFO queue of open challenge ids on one blobber.
pub fn blobber_challenge_queue_key(blobber_id: &AccountId) -> Vec<u8> {
    [BLOBBER_CHALLENGE_QUEUE_PREFIX, blobber_id.as_ref()].concat()
}

/// Metadata key for an arbitrarily-named `PartitionedSet` (partition count,
/// fill level of the last partition).
pub fn partition_meta_key(name: &str) -> Vec<u8> {
    [b"partitions:", name.as_bytes(), b":meta"].concat()
}

/// Key for one partition node within an arbitrarily-named `PartitionedSet`.
pub fn partition_node_key(name: &str, index: u64) -> Vec<u8> {
    [
        b"partitions:".as_slice(),
        name.as_bytes(),
        b":",
        index.to_string().as_bytes(),
    ]
    .concat()
}
