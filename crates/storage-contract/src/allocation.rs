//! Allocation lifecycle: `Created -> Active -> {Closed | Cancelled} ->
//! Finalized` (spec.md §4.7.1).

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use meridian_api::state::StateAccess;
use meridian_api::transaction::context::TxContext;
use meridian_stake::prelude::{Ratio, StakePool};
use meridian_types::app::{AccountId, Timestamp};
use meridian_types::config::StorageContractConfig;
use meridian_types::keys::{
    allocation_key, blobber_allocation_key, challenge_pool_key, stake_pool_key, write_pool_key,
};

use crate::error::StorageError;
use crate::types::{Allocation, AllocationStatus, BlobberAllocation, ChallengePool, WritePool};

/// Parameters a client submits to open a new allocation.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct NewAllocationRequest {
    pub id: String,
    pub data_shards: u32,
    pub parity_shards: u32,
    pub size: u64,
    pub duration_seconds: i64,
    pub read_price: u128,
    pub write_price: u128,
    pub challenge_completion_time: i64,
    /// Candidate blobbers satisfying the client's price/ccts constraints,
    /// already ranked with any client-preferred blobbers first. Blobber
    /// discovery against the challenge-ready/blobber partitions happens in
    /// the caller (the method dispatcher), not here, so this function stays
    /// a pure function of its inputs and `state`.
    pub candidate_blobbers: Vec<AccountId>,
}

fn read_allocation(
    state: &dyn StateAccess,
    allocation_id: &str,
) -> Result<Allocation, StorageError> {
    let bytes = state
        .get(&allocation_key(allocation_id))
        .map_err(|e| StorageError::State(e.to_string()))?
        .ok_or_else(|| StorageError::UnknownAllocation(allocation_id.to_string()))?;
    Allocation::decode(&mut bytes.as_slice()).map_err(|e| StorageError::State(e.to_string()))
}

fn write_allocation(state: &mut dyn StateAccess, allocation: &Allocation) -> Result<(), StorageError> {
    state
        .insert(&allocation_key(&allocation.id), &allocation.encode())
        .map_err(|e| StorageError::State(e.to_string()))
}

fn read_write_pool(state: &dyn StateAccess, owner: &AccountId) -> Result<WritePool, StorageError> {
    match state
        .get(&write_pool_key(owner))
        .map_err(|e| StorageError::State(e.to_string()))?
    {
        Some(bytes) => WritePool::decode(&mut bytes.as_slice()).map_err(|e| StorageError::State(e.to_string())),
        None => Ok(WritePool::default()),
    }
}

fn write_write_pool(
    state: &mut dyn StateAccess,
    owner: &AccountId,
    pool: &WritePool,
) -> Result<(), StorageError> {
    state
        .insert(&write_pool_key(owner), &pool.encode())
        .map_err(|e| StorageError::State(e.to_string()))
}

fn read_blobber_allocation(
    state: &dyn StateAccess,
    allocation_id: &str,
    blobber_id: &AccountId,
) -> Result<BlobberAllocation, StorageError> {
    let bytes = state
        .get(&blobber_allocation_key(allocation_id, blobber_id))
        .map_err(|e| StorageError::State(e.to_string()))?
        .ok_or_else(|| StorageError::UnknownBlobberAllocation(blobber_id.to_hex()))?;
    BlobberAllocation::decode(&mut bytes.as_slice()).map_err(|e| StorageError::State(e.to_string()))
}

fn write_blobber_allocation(
    state: &mut dyn StateAccess,
    entry: &BlobberAllocation,
) -> Result<(), StorageError> {
    state
        .insert(
            &blobber_allocation_key(&entry.allocation_id, &entry.blobber_id),
            &entry.encode(),
        )
        .map_err(|e| StorageError::State(e.to_string()))
}

fn read_stake_pool(state: &dyn StateAccess, provider: &AccountId) -> Result<StakePool, StorageError> {
    match state
        .get(&stake_pool_key(provider))
        .map_err(|e| StorageError::State(e.to_string()))?
    {
        Some(bytes) => StakePool::decode(&mut bytes.as_slice()).map_err(|e| StorageError::State(e.to_string())),
        None => Ok(StakePool::new(*provider, Ratio::new(1, 10))),
    }
}

fn write_stake_pool(state: &mut dyn StateAccess, pool: &StakePool) -> Result<(), StorageError> {
    state
        .insert(&stake_pool_key(&pool.provider_id), &pool.encode())
        .map_err(|e| StorageError::State(e.to_string()))
}

fn size_per_blobber_gb(size_per_blobber: u64) -> f64 {
    size_per_blobber as f64 / (1024.0 * 1024.0 * 1024.0)
}

fn min_lock_demand(
    config: &StorageContractConfig,
    size_per_blobber: u64,
    write_price: u128,
    duration_seconds: i64,
) -> u128 {
    let alloc_duration_tus = duration_seconds as f64 / config.time_unit_seconds.max(1) as f64;
    let demand = config.min_lock_demand_ratio
        * size_per_blobber_gb(size_per_blobber)
        * write_price as f64
        * alloc_duration_tus;
    demand.max(0.0) as u128
}

/// Opens a new allocation: selects the first `data_shards + parity_shards`
/// candidates, funds a write pool from the transaction's attached value,
/// offers collateral on each selected blobber's stake pool, and registers
/// each blobber's min-lock-demand (spec.md §4.7.1).
pub fn new_allocation_request(
    state: &mut dyn StateAccess,
    config: &StorageContractConfig,
    ctx: &TxContext,
    request: NewAllocationRequest,
) -> Result<Allocation, StorageError> {
    let needed = request.data_shards + request.parity_shards;
    if request.candidate_blobbers.len() < needed as usize {
        return Err(StorageError::InsufficientBlobbers { needed });
    }
    let blobbers: Vec<AccountId> = request
        .candidate_blobbers
        .into_iter()
        .take(needed as usize)
        .collect();

    let mut write_pool = read_write_pool(state, &ctx.signer)?;
    write_pool.balance = write_pool
        .balance
        .checked_add(ctx.value)
        .ok_or_else(|| StorageError::State("write pool balance overflow".into()))?;

    let allocation = Allocation {
        id: request.id.clone(),
        owner: ctx.signer,
        data_shards: request.data_shards,
        parity_shards: request.parity_shards,
        size: request.size,
        expiration: Timestamp(ctx.block_timestamp.0.saturating_add(request.duration_seconds)),
        write_price: request.write_price,
        read_price: request.read_price,
        challenge_completion_time: request.challenge_completion_time,
        blobbers: blobbers.clone(),
        status: AllocationStatus::Created,
    };
    let size_per_blobber = allocation.size_per_blobber();
    let offer_amount = size_per_blobber as u128 * request.write_price;
    let demand = min_lock_demand(config, size_per_blobber, request.write_price, request.duration_seconds);

    if write_pool.balance < offer_amount * blobbers.len() as u128 {
        return Err(StorageError::InsufficientWritePool {
            balance: write_pool.balance,
            required: offer_amount * blobbers.len() as u128,
        });
    }

    let offer_expire = allocation.expiration.0.max(0) as u64;
    for blobber_id in &blobbers {
        let mut pool = read_stake_pool(state, blobber_id)?;
        pool.add_offer(allocation.id.clone(), offer_amount, offer_expire)
            .map_err(|e| StorageError::State(e.to_string()))?;
        write_stake_pool(state, &pool)?;

        write_blobber_allocation(
            state,
            &BlobberAllocation {
                allocation_id: allocation.id.clone(),
                blobber_id: *blobber_id,
                min_lock_demand: demand,
                spent: 0,
                used_capacity: 0,
                last_redeemed: ctx.block_timestamp,
            },
        )?;
    }

    write_write_pool(state, &ctx.signer, &write_pool)?;
    state
        .insert(&challenge_pool_key(&allocation.id), &ChallengePool::default().encode())
        .map_err(|e| StorageError::State(e.to_string()))?;

    let mut allocation = allocation;
    allocation.status = AllocationStatus::Active;
    write_allocation(state, &allocation)?;
    Ok(allocation)
}

/// Parameters a client submits to request a free (promotional) allocation.
/// Unlike [`NewAllocationRequest`], every sizing/pricing parameter comes
/// from `config.free_allocation_settings` rather than the client; only the
/// allocation id and candidate blobber set are caller-chosen (spec.md
/// §4.7.1 expansion: free allocations).
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct FreeAllocationRequest {
    pub id: String,
    pub candidate_blobbers: Vec<AccountId>,
}

/// Opens a promotional allocation funded by a pre-authorized marker
/// transaction rather than the client's own write pool contribution: every
/// sizing/pricing parameter comes from `config.free_allocation_settings`
/// (priced at the bottom of each configured range), and `ctx.value` is
/// expected to already carry the marker transaction's pre-authorized
/// funding. Otherwise identical to `new_allocation_request`.
pub fn free_allocation_request(
    state: &mut dyn StateAccess,
    config: &StorageContractConfig,
    ctx: &TxContext,
    request: FreeAllocationRequest,
) -> Result<Allocation, StorageError> {
    let settings = &config.free_allocation_settings;
    let inner = NewAllocationRequest {
        id: request.id,
        data_shards: settings.data_shards as u32,
        parity_shards: settings.parity_shards as u32,
        size: settings.size,
        duration_seconds: settings.duration_seconds,
        read_price: settings.read_price_range.0,
        write_price: settings.write_price_range.0,
        challenge_completion_time: config.max_challenge_completion_time_seconds,
        candidate_blobbers: request.candidate_blobbers,
    };
    new_allocation_request(state, config, ctx, inner)
}

/// Extends or reduces an allocation's size/duration (spec.md §4.7.1).
/// `extra_size`/`extra_duration_seconds` are positive to extend, negative
/// to reduce (reduction floors at the allocation's original size/duration,
/// never below; extension never decreases min-lock-demand).
pub fn update_allocation_request(
    state: &mut dyn StateAccess,
    config: &StorageContractConfig,
    allocation_id: &str,
    extra_size: i64,
    extra_duration_seconds: i64,
) -> Result<Allocation, StorageError> {
    let mut allocation = read_allocation(state, allocation_id)?;
    if allocation.status != AllocationStatus::Active {
        return Err(StorageError::WrongAllocationStatus(allocation_id.to_string()));
    }

    if extra_size >= 0 && extra_duration_seconds >= 0 {
        allocation.size = allocation.size.saturating_add(extra_size as u64);
        allocation.expiration = allocation
            .expiration
            .add_seconds(extra_duration_seconds);
    } else {
        // Reducing: only half of the requested cut is actually applied, and
        // it never takes size/remaining duration below half of what they
        // were before the request.
        let size_floor = allocation.size / 2;
        let size_cut = (extra_size.unsigned_abs() / 2).min(allocation.size - size_floor);
        allocation.size -= size_cut;

        let duration_floor = allocation.expiration.0 / 2;
        let duration_cut = (extra_duration_seconds.unsigned_abs() as i64 / 2)
            .min(allocation.expiration.0 - duration_floor);
        allocation.expiration = allocation.expiration.add_seconds(-duration_cut);
    }

    let size_per_blobber = allocation.size_per_blobber();
    let new_expire = allocation.expiration.0.max(0) as u64;
    for blobber_id in allocation.blobbers.clone() {
        let mut entry = read_blobber_allocation(state, allocation_id, &blobber_id)?;
        let candidate_demand = min_lock_demand(
            config,
            size_per_blobber,
            allocation.write_price,
            allocation.expiration.0,
        );
        if extra_size >= 0 {
            entry.min_lock_demand = entry.min_lock_demand.max(candidate_demand);
        }
        write_blobber_allocation(state, &entry)?;

        let mut pool = read_stake_pool(state, &blobber_id)?;
        let offer_amount = size_per_blobber as u128 * allocation.write_price;
        if extra_size >= 0 {
            let additional = offer_amount.saturating_sub(
                pool.find_offer(allocation_id).map(|o| o.lock).unwrap_or(0),
            );
            if additional > 0 {
                pool.extend_offer(allocation_id, additional, new_expire)
                    .map_err(|e| StorageError::State(e.to_string()))?;
            }
        }
        write_stake_pool(state, &pool)?;
    }

    write_allocation(state, &allocation)?;
    Ok(allocation)
}

/// Marks an allocation closed as of the current block's timestamp.
pub fn close_allocation(
    state: &mut dyn StateAccess,
    allocation_id: &str,
    now: Timestamp,
) -> Result<Allocation, StorageError> {
    let mut allocation = read_allocation(state, allocation_id)?;
    if allocation.status != AllocationStatus::Active {
        return Err(StorageError::WrongAllocationStatus(allocation_id.to_string()));
    }
    if allocation.expiration <= now {
        return Err(StorageError::AllocationAlreadyExpired(allocation_id.to_string()));
    }
    allocation.expiration = now;
    allocation.status = AllocationStatus::Closed;
    write_allocation(state, &allocation)?;
    Ok(allocation)
}

/// Settles an allocation once it has passed `expiration +
/// challenge_completion_time`: drains the remaining challenge pool back to
/// the write pool, releases every blobber's offer, pays each blobber the
/// larger of its unpaid min-lock-demand or zero, and returns whatever
/// remains in the write pool to the owner.
pub fn finalize_allocation(
    state: &mut dyn StateAccess,
    allocation_id: &str,
    now: Timestamp,
) -> Result<u128, StorageError> {
    let mut allocation = read_allocation(state, allocation_id)?;
    if matches!(allocation.status, AllocationStatus::Finalized) {
        return Err(StorageError::WrongAllocationStatus(allocation_id.to_string()));
    }
    let ready_at = allocation
        .expiration
        .add_seconds(allocation.challenge_completion_time);
    if now < ready_at {
        return Err(StorageError::WrongAllocationStatus(allocation_id.to_string()));
    }

    let challenge_pool_key_bytes = challenge_pool_key(allocation_id);
    let mut challenge_pool: ChallengePool = match state
        .get(&challenge_pool_key_bytes)
        .map_err(|e| StorageError::State(e.to_string()))?
    {
        Some(bytes) => {
            ChallengePool::decode(&mut bytes.as_slice()).map_err(|e| StorageError::State(e.to_string()))?
        }
        None => ChallengePool::default(),
    };

    let mut write_pool = read_write_pool(state, &allocation.owner)?;
    write_pool.balance = write_pool.balance.saturating_add(challenge_pool.balance);
    challenge_pool.balance = 0;

    for blobber_id in allocation.blobbers.clone() {
        let entry = read_blobber_allocation(state, allocation_id, &blobber_id)?;
        let owed = entry.min_lock_demand.saturating_sub(entry.spent);

        let mut pool = read_stake_pool(state, &blobber_id)?;
        let _ = pool.release_offer(allocation_id);
        if owed > 0 {
            write_pool.balance = write_pool.balance.saturating_sub(owed.min(write_pool.balance));
            pool.distribute_rewards(owed);
        }
        write_stake_pool(state, &pool)?;
    }

    state
        .insert(&challenge_pool_key_bytes, &challenge_pool.encode())
        .map_err(|e| StorageError::State(e.to_string()))?;

    let payout = write_pool.balance;
    write_pool.balance = 0;
    write_write_pool(state, &allocation.owner, &write_pool)?;

    allocation.status = AllocationStatus::Finalized;
    write_allocation(state, &allocation)?;

    Ok(payout)
}

pub fn get_allocation(state: &dyn StateAccess, allocation_id: &str) -> Result<Allocation, StorageError> {
    read_allocation(state, allocation_id)
}

pub fn get_blobber_allocation(
    state: &dyn StateAccess,
    allocation_id: &str,
    blobber_id: &AccountId,
) -> Result<BlobberAllocation, StorageError> {
    read_blobber_allocation(state, allocation_id, blobber_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_state::trie_backend::TrieStateAccess;
    use meridian_trie::prelude::InMemoryTrieNodeStore;
    use meridian_types::app::ChainId;

    fn account(byte: u8) -> AccountId {
        AccountId([byte; 32])
    }

    fn ctx(signer: AccountId, value: u128) -> TxContext {
        TxContext {
            round: 1,
            block_timestamp: Timestamp(1_000),
            chain_id: ChainId(1),
            signer,
            txn_hash: [0u8; 32],
            prev_block_hash: [0u8; 32],
            value,
            simulation: false,
        }
    }

    #[test]
    fn new_allocation_request_funds_write_pool_and_offers_stake() {
        let store = InMemoryTrieNodeStore::new();
        let mut access = TrieStateAccess::new(&store, None);
        let config = StorageContractConfig::default();
        let owner = account(1);

        let request = NewAllocationRequest {
            id: "alloc-1".into(),
            data_shards: 2,
            parity_shards: 1,
            size: 3 * 1024 * 1024 * 1024,
            duration_seconds: 3600,
            read_price: 1,
            write_price: 10,
            challenge_completion_time: 600,
            candidate_blobbers: vec![account(2), account(3), account(4)],
        };

        let allocation = new_allocation_request(&mut access, &config, &ctx(owner, 1_000_000), request)
            .expect("new_allocation_request");
        assert_eq!(allocation.status, AllocationStatus::Active);
        assert_eq!(allocation.blobbers.len(), 3);

        let entry = get_blobber_allocation(&access, "alloc-1", &account(2)).expect("entry");
        assert!(entry.min_lock_demand > 0);
    }

    #[test]
    fn new_allocation_request_fails_with_too_few_blobbers() {
        let store = InMemoryTrieNodeStore::new();
        let mut access = TrieStateAccess::new(&store, None);
        let config = StorageContractConfig::default();

        let request = NewAllocationRequest {
            id: "alloc-2".into(),
            data_shards: 4,
            parity_shards: 2,
            size: 1024,
            duration_seconds: 3600,
            read_price: 1,
            write_price: 10,
            challenge_completion_time: 600,
            candidate_blobbers: vec![account(2)],
        };

        let result = new_allocation_request(&mut access, &config, &ctx(account(1), 1_000), request);
        assert!(result.is_err());
    }

    #[test]
    fn close_allocation_sets_expiration_to_now() {
        let store = InMemoryTrieNodeStore::new();
        let mut access = TrieStateAccess::new(&store, None);
        let config = StorageContractConfig::default();

        let request = NewAllocationRequest {
            id: "alloc-3".into(),
            data_shards: 1,
            parity_shards: 1,
            size: 2 * 1024 * 1024 * 1024,
            duration_seconds: 3600,
            read_price: 1,
            write_price: 10,
            challenge_completion_time: 600,
            candidate_blobbers: vec![account(2), account(3)],
        };
        new_allocation_request(&mut access, &config, &ctx(account(1), 1_000_000), request)
            .expect("new_allocation_request");

        let closed = close_allocation(&mut access, "alloc-3", Timestamp(2_000)).expect("close_allocation");
        assert_eq!(closed.status, AllocationStatus::Closed);
        assert_eq!(closed.expiration, Timestamp(2_000));
    }

    #[test]
    fn close_allocation_rejects_an_already_expired_allocation() {
        let store = InMemoryTrieNodeStore::new();
        let mut access = TrieStateAccess::new(&store, None);
        let config = StorageContractConfig::default();

        let request = NewAllocationRequest {
            id: "alloc-4".into(),
            data_shards: 1,
            parity_shards: 1,
            size: 2 * 1024 * 1024 * 1024,
            duration_seconds: 3600,
            read_price: 1,
            write_price: 10,
            challenge_completion_time: 600,
            candidate_blobbers: vec![account(2), account(3)],
        };
        let allocation = new_allocation_request(&mut access, &config, &ctx(account(1), 1_000_000), request)
            .expect("new_allocation_request");

        let result = close_allocation(&mut access, "alloc-4", allocation.expiration);
        assert!(matches!(
            result,
            Err(StorageError::AllocationAlreadyExpired(_))
        ));

        let result = close_allocation(
            &mut access,
            "alloc-4",
            Timestamp(allocation.expiration.0 + 1),
        );
        assert!(matches!(
            result,
            Err(StorageError::AllocationAlreadyExpired(_))
        ));
    }

    #[test]
    fn free_allocation_request_uses_the_configured_settings() {
        let store = InMemoryTrieNodeStore::new();
        let mut access = TrieStateAccess::new(&store, None);
        let config = StorageContractConfig::default();
        let settings = config.free_allocation_settings.clone();

        let request = FreeAllocationRequest {
            id: "free-alloc-1".into(),
            candidate_blobbers: vec![account(2), account(3), account(4), account(5), account(6), account(7)],
        };

        let allocation = free_allocation_request(&mut access, &config, &ctx(account(1), 1_000_000_000), request)
            .expect("free_allocation_request");
        assert_eq!(allocation.status, AllocationStatus::Active);
        assert_eq!(allocation.data_shards, settings.data_shards as u32);
        assert_eq!(allocation.parity_shards, settings.parity_shards as u32);
        assert_eq!(allocation.size, settings.size);
        assert_eq!(allocation.read_price, settings.read_price_range.0);
        assert_eq!(allocation.write_price, settings.write_price_range.0);
    }
}
