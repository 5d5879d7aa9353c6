//! The storage challenge protocol: deterministic generation, validator
//! response verification, proportional reward/penalty settlement, and
//! FIFO expiry sweeping (spec.md §4.7.2, §4.7.3).

use parity_scale_codec::{Decode, Encode};

use meridian_api::state::StateAccess;
use meridian_crypto::ecdsa;
use meridian_crypto::hash::sha3_256_concat;
use meridian_stake::prelude::{Ratio, StakePool};
use meridian_types::app::{
    duration_in_time_units, AccountId, OffenseFacts, OffenseReport, OffenseType, Timestamp,
};
use meridian_types::config::StorageContractConfig;
use meridian_types::keys::{
    allocation_challenge_queue_key, blobber_allocation_key, blobber_challenge_queue_key, challenge_key,
    challenge_pool_key, stake_pool_key, write_pool_key,
};

use meridian_state::prelude::PartitionedSet;

use crate::error::StorageError;
use crate::types::{
    BlobberPartitionEntry, ChallengePool, ChallengeStatus, StorageChallenge, ValidationTicket, WritePool,
};

/// Resolves a validator account id to the public key its `ValidationTicket`
/// signatures must verify against, decoupling this module from wherever
/// validator identity is actually registered.
pub trait ValidatorKeyResolver: Send + Sync {
    fn public_key_of(&self, validator: &AccountId) -> Option<Vec<u8>>;
}

const TAG_MODE: u64 = 0x01;
const TAG_BLOBBER: u64 = 0x02;
const TAG_ALLOCATION: u64 = 0x03;
const TAG_VALIDATOR: u64 = 0x04;

/// Derives the base PRNG seed for one challenge from the executing
/// transaction's hash and the parent block's hash (spec.md §4.7.2 step 1).
pub fn challenge_seed(txn_hash: &[u8; 32], prev_block_hash: &[u8; 32]) -> i64 {
    let digest = sha3_256_concat(&[txn_hash.as_slice(), prev_block_hash.as_slice(), b"1"]);
    let mut high = [0u8; 8];
    high.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(high)
}

fn mix(seed: i64, tag: u64) -> u64 {
    (seed as u64) ^ tag
}

fn blobber_allocations_partition(blobber_id: &AccountId) -> PartitionedSet<String> {
    PartitionedSet::new(format!("blobber_allocs:{}", blobber_id.to_hex()))
}

/// Generates one challenge against the challenge-ready blobber partition,
/// the chosen blobber's allocation partition, and the validator partition
/// (spec.md §4.7.2 steps 2-5). Returns `None` if any partition the
/// selection needs is currently empty.
pub fn generate_challenge(
    state: &mut dyn StateAccess,
    id: String,
    seed: i64,
    challenge_ready: &PartitionedSet<BlobberPartitionEntry>,
    validators: &PartitionedSet<AccountId>,
    now: Timestamp,
) -> Result<Option<StorageChallenge>, StorageError> {
    let mode_seed = mix(seed, TAG_MODE);
    let weight_by_capacity = mode_seed % 2 == 0;

    let blobber_id = if weight_by_capacity {
        let candidates = challenge_ready
            .random_distinct(state, mix(seed, TAG_BLOBBER), 5)
            .map_err(|e| StorageError::State(e.to_string()))?;
        candidates
            .into_iter()
            .max_by_key(|(_, entry)| entry.used_capacity)
            .map(|(_, entry)| entry.blobber_id)
    } else {
        challenge_ready
            .random_item(state, mix(seed, TAG_BLOBBER))
            .map_err(|e| StorageError::State(e.to_string()))?
            .map(|(_, entry)| entry.blobber_id)
    };
    let Some(blobber_id) = blobber_id else {
        return Ok(None);
    };

    let allocations = blobber_allocations_partition(&blobber_id);
    let Some((_, allocation_id)) = allocations
        .random_item(state, mix(seed, TAG_ALLOCATION))
        .map_err(|e| StorageError::State(e.to_string()))?
    else {
        return Ok(None);
    };

    let data_shards = crate::allocation::get_allocation(state, &allocation_id)?.data_shards as usize;

    let drawn = validators
        .random_distinct(state, mix(seed, TAG_VALIDATOR), data_shards + 1)
        .map_err(|e| StorageError::State(e.to_string()))?;
    let validator_ids: Vec<AccountId> = drawn
        .into_iter()
        .map(|(_, id)| id)
        .filter(|id| *id != blobber_id)
        .take(data_shards)
        .collect();

    let challenge = StorageChallenge {
        id: id.clone(),
        allocation_id: allocation_id.clone(),
        blobber_id,
        validators: validator_ids,
        created: now,
        status: ChallengeStatus::Open,
    };

    state
        .insert(&challenge_key(&id), &challenge.encode())
        .map_err(|e| StorageError::State(e.to_string()))?;
    push_queue(state, &allocation_challenge_queue_key(&allocation_id), &id)?;
    push_queue(state, &blobber_challenge_queue_key(&blobber_id), &id)?;

    Ok(Some(challenge))
}

fn read_queue(state: &dyn StateAccess, key: &[u8]) -> Result<Vec<String>, StorageError> {
    match state.get(key).map_err(|e| StorageError::State(e.to_string()))? {
        Some(bytes) => Vec::<String>::decode(&mut bytes.as_slice()).map_err(|e| StorageError::State(e.to_string())),
        None => Ok(Vec::new()),
    }
}

fn write_queue(state: &mut dyn StateAccess, key: &[u8], queue: &[String]) -> Result<(), StorageError> {
    state
        .insert(key, &queue.to_vec().encode())
        .map_err(|e| StorageError::State(e.to_string()))
}

fn push_queue(state: &mut dyn StateAccess, key: &[u8], challenge_id: &str) -> Result<(), StorageError> {
    let mut queue = read_queue(state, key)?;
    queue.push(challenge_id.to_string());
    write_queue(state, key, &queue)
}

/// Sweeps both queues for the challenge's allocation/blobber, expiring any
/// open challenge whose `created + challenge_completion_time < now`
/// (spec.md §4.7.3). Expired challenges are counted as failures via the
/// penalty path and removed from both FIFO queues, in creation order.
pub fn sweep_expired(
    state: &mut dyn StateAccess,
    allocation_id: &str,
    blobber_id: &AccountId,
    challenge_completion_time: i64,
    now: Timestamp,
) -> Result<Vec<OffenseReport>, StorageError> {
    let mut reports = Vec::new();
    for key in [
        allocation_challenge_queue_key(allocation_id),
        blobber_challenge_queue_key(blobber_id),
    ] {
        let mut queue = read_queue(state, &key)?;
        let mut cut = 0;
        for challenge_id in &queue {
            let bytes = state
                .get(&challenge_key(challenge_id))
                .map_err(|e| StorageError::State(e.to_string()))?;
            let Some(bytes) = bytes else {
                cut += 1;
                continue;
            };
            let mut challenge = StorageChallenge::decode(&mut bytes.as_slice())
                .map_err(|e| StorageError::State(e.to_string()))?;
            if challenge.status != ChallengeStatus::Open {
                cut += 1;
                continue;
            }
            if challenge.created.add_seconds(challenge_completion_time) >= now {
                break;
            }
            challenge.status = ChallengeStatus::Expired;
            state
                .insert(&challenge_key(challenge_id), &challenge.encode())
                .map_err(|e| StorageError::State(e.to_string()))?;
            let facts = OffenseFacts {
                offender: challenge.blobber_id,
                offense_type: OffenseType::FailedChallenge,
                context_id: sha3_256_from_id(challenge_id),
            };
            reports.push(OffenseReport {
                facts,
                proof: challenge_id.as_bytes().to_vec(),
            });
            cut += 1;
        }
        if cut > 0 {
            queue.drain(0..cut);
            write_queue(state, &key, &queue)?;
        }
    }
    Ok(reports)
}

fn sha3_256_from_id(challenge_id: &str) -> [u8; 32] {
    meridian_crypto::hash::sha3_256(challenge_id.as_bytes())
}

/// Outcome of verifying a blobber's response to one challenge.
#[derive(Debug, Clone, PartialEq)]
pub enum ChallengeOutcome {
    /// Not enough validation tickets have arrived yet to decide.
    Pending,
    Passed { partial: f64 },
    Failed,
}

/// Reads one challenge by id.
pub fn get_challenge(state: &dyn StateAccess, challenge_id: &str) -> Result<StorageChallenge, StorageError> {
    let bytes = state
        .get(&challenge_key(challenge_id))
        .map_err(|e| StorageError::State(e.to_string()))?
        .ok_or_else(|| StorageError::UnknownChallenge(challenge_id.to_string()))?;
    StorageChallenge::decode(&mut bytes.as_slice()).map_err(|e| StorageError::State(e.to_string()))
}

/// Verifies a blobber's challenge response against its validator tickets
/// (spec.md §4.7.2 response verification).
pub fn verify_response(
    state: &dyn StateAccess,
    resolver: &dyn ValidatorKeyResolver,
    challenge_id: &str,
    responding_blobber: &AccountId,
    tickets: &[ValidationTicket],
    now: Timestamp,
    challenge_completion_time: i64,
) -> Result<(ChallengeOutcome, StorageChallenge), StorageError> {
    let challenge = get_challenge(state, challenge_id)?;
    if challenge.status != ChallengeStatus::Open {
        return Err(StorageError::ChallengeNotOpen(challenge_id.to_string()));
    }
    if *responding_blobber != challenge.blobber_id {
        return Err(StorageError::Unauthorized(responding_blobber.to_hex()));
    }

    let mut seen = std::collections::BTreeSet::new();
    let mut success = 0usize;
    let mut failure = 0usize;
    for ticket in tickets {
        if ticket.challenge_id != challenge_id {
            continue;
        }
        if !challenge.validators.contains(&ticket.validator_id) {
            continue;
        }
        if !seen.insert(ticket.validator_id) {
            continue;
        }
        let Some(public_key) = resolver.public_key_of(&ticket.validator_id) else {
            continue;
        };
        let message = [
            ticket.challenge_id.as_bytes(),
            ticket.validator_id.as_ref(),
            &[ticket.passed as u8],
        ]
        .concat();
        if ecdsa::verify(&public_key, &message, &ticket.signature).is_err() {
            continue;
        }
        if ticket.passed {
            success += 1;
        } else {
            failure += 1;
        }
    }

    let total_validators = challenge.validators.len();
    let threshold = total_validators / 2;
    let fresh = challenge.created.add_seconds(challenge_completion_time) >= now;
    let pass = success > threshold || (success > failure && success + failure < threshold);
    let full_turnout = success + failure >= total_validators;

    let outcome = if pass && fresh {
        let partial = if threshold == 0 {
            1.0
        } else {
            (success as f64 / threshold as f64).min(1.0)
        };
        ChallengeOutcome::Passed { partial }
    } else if (pass && !fresh) || failure > threshold || full_turnout {
        ChallengeOutcome::Failed
    } else {
        ChallengeOutcome::Pending
    };

    Ok((outcome, challenge))
}

fn read_pool<T: Decode + Default>(state: &dyn StateAccess, key: &[u8]) -> Result<T, StorageError> {
    match state.get(key).map_err(|e| StorageError::State(e.to_string()))? {
        Some(bytes) => T::decode(&mut bytes.as_slice()).map_err(|e| StorageError::State(e.to_string())),
        None => Ok(T::default()),
    }
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

/// Settles a decided challenge's token movements: validator reward share,
/// blobber reward/penalty, write-pool/challenge-pool adjustments
/// (spec.md §4.7.2 reward/penalty movements). Marks the challenge
/// `Passed`/`Failed` and advances the blobber allocation's
/// `last_redeemed` watermark.
pub fn settle_challenge(
    state: &mut dyn StateAccess,
    config: &StorageContractConfig,
    challenge: &StorageChallenge,
    outcome: &ChallengeOutcome,
    responding_validators: &[AccountId],
    now: Timestamp,
) -> Result<(), StorageError> {
    let allocation = crate::allocation::get_allocation(state, &challenge.allocation_id)?;
    let mut entry = crate::allocation::get_blobber_allocation(state, &challenge.allocation_id, &challenge.blobber_id)?;

    let dtu = duration_in_time_units(entry.last_redeemed, now, config.time_unit_seconds);
    let rdtu = duration_in_time_units(entry.last_redeemed, allocation.expiration, config.time_unit_seconds);
    let moved = entry.challenge(dtu, rdtu);

    let mut challenge_pool: ChallengePool = read_pool(state, &challenge_pool_key(&challenge.allocation_id))?;
    let mut write_pool: WritePool = read_pool(state, &write_pool_key(&allocation.owner))?;
    let mut blobber_pool = read_stake_pool(state, &challenge.blobber_id)?;

    let validator_share = (config.validator_reward_ratio * moved as f64) as u128;
    if !responding_validators.is_empty() && validator_share > 0 {
        let per_validator = validator_share / responding_validators.len() as u128;
        for validator_id in responding_validators {
            let mut pool = read_stake_pool(state, validator_id)?;
            pool.distribute_rewards(per_validator);
            write_stake_pool(state, &pool)?;
        }
    }
    let remainder = moved.saturating_sub(validator_share);

    let mut final_status = challenge.status;
    match outcome {
        ChallengeOutcome::Passed { partial } => {
            let to_blobber = (remainder as f64 * partial) as u128;
            let to_write_pool = remainder.saturating_sub(to_blobber);
            blobber_pool.distribute_rewards(to_blobber);
            write_pool.balance = write_pool.balance.saturating_add(to_write_pool);
            challenge_pool.balance = challenge_pool.balance.saturating_sub(moved.min(challenge_pool.balance));
            entry.spent = entry.spent.saturating_add(to_blobber);
            final_status = ChallengeStatus::Passed;
        }
        ChallengeOutcome::Failed => {
            write_pool.balance = write_pool.balance.saturating_add(remainder);
            let slash_fraction = Ratio::new((config.blobber_slash * 1000.0) as u64, 1000);
            blobber_pool.slash(slash_fraction);
            challenge_pool.balance = challenge_pool.balance.saturating_sub(moved.min(challenge_pool.balance));
            final_status = ChallengeStatus::Failed;
        }
        ChallengeOutcome::Pending => return Ok(()),
    }

    entry.last_redeemed = now;
    write_stake_pool(state, &blobber_pool)?;
    state
        .insert(
            &blobber_allocation_key(&challenge.allocation_id, &challenge.blobber_id),
            &entry.encode(),
        )
        .map_err(|e| StorageError::State(e.to_string()))?;
    state
        .insert(&write_pool_key(&allocation.owner), &write_pool.encode())
        .map_err(|e| StorageError::State(e.to_string()))?;
    state
        .insert(&challenge_pool_key(&challenge.allocation_id), &challenge_pool.encode())
        .map_err(|e| StorageError::State(e.to_string()))?;

    let mut settled = challenge.clone();
    settled.status = final_status;
    state
        .insert(&challenge_key(&challenge.id), &settled.encode())
        .map_err(|e| StorageError::State(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::{new_allocation_request, NewAllocationRequest};
    use meridian_api::transaction::context::TxContext;
    use meridian_crypto::ecdsa::EcdsaKeyPair;
    use meridian_state::trie_backend::TrieStateAccess;
    use meridian_trie::prelude::InMemoryTrieNodeStore;
    use meridian_types::app::ChainId;
    use std::collections::BTreeMap;

    fn account(byte: u8) -> AccountId {
        AccountId([byte; 32])
    }

    struct MapResolver(BTreeMap<AccountId, Vec<u8>>);
    impl ValidatorKeyResolver for MapResolver {
        fn public_key_of(&self, validator: &AccountId) -> Option<Vec<u8>> {
            self.0.get(validator).cloned()
        }
    }

    fn sign_ticket(keypair: &EcdsaKeyPair, challenge_id: &str, validator_id: AccountId, passed: bool) -> ValidationTicket {
        let message = [challenge_id.as_bytes(), validator_id.as_ref(), &[passed as u8]].concat();
        ValidationTicket {
            challenge_id: challenge_id.to_string(),
            validator_id,
            passed,
            signature: keypair.sign(&message),
        }
    }

    fn ctx(signer: AccountId, value: u128) -> TxContext {
        TxContext {
            round: 1,
            block_timestamp: Timestamp(1_000),
            chain_id: ChainId(1),
            signer,
            txn_hash: [1u8; 32],
            prev_block_hash: [2u8; 32],
            value,
            simulation: false,
        }
    }

    fn setup_allocation(access: &mut TrieStateAccess, config: &StorageContractConfig) -> String {
        let request = NewAllocationRequest {
            id: "alloc-1".into(),
            data_shards: 1,
            parity_shards: 1,
            size: 2 * 1024 * 1024 * 1024,
            duration_seconds: 36_000,
            read_price: 1,
            write_price: 10,
            challenge_completion_time: 600,
            candidate_blobbers: vec![account(10), account(11)],
        };
        new_allocation_request(access, config, &ctx(account(1), 1_000_000), request)
            .expect("new_allocation_request")
            .id
    }

    #[test]
    fn response_with_majority_pass_within_freshness_window_passes() {
        let store = InMemoryTrieNodeStore::new();
        let mut access = TrieStateAccess::new(&store, None);
        let config = StorageContractConfig::default();
        let allocation_id = setup_allocation(&mut access, &config);

        let v1 = EcdsaKeyPair::generate();
        let v2 = EcdsaKeyPair::generate();
        let validators = vec![account(20), account(21)];
        let mut keys = BTreeMap::new();
        keys.insert(account(20), v1.public_key_bytes());
        keys.insert(account(21), v2.public_key_bytes());
        let resolver = MapResolver(keys);

        let challenge = StorageChallenge {
            id: "ch-1".into(),
            allocation_id,
            blobber_id: account(10),
            validators: validators.clone(),
            created: Timestamp(1_000),
            status: ChallengeStatus::Open,
        };
        access
            .insert(&challenge_key(&challenge.id), &challenge.encode())
            .expect("insert challenge");

        let tickets = vec![
            sign_ticket(&v1, "ch-1", account(20), true),
            sign_ticket(&v2, "ch-1", account(21), true),
        ];

        let (outcome, _) = verify_response(&access, &resolver, "ch-1", &account(10), &tickets, Timestamp(1_100), 600)
            .expect("verify_response");
        assert_eq!(outcome, ChallengeOutcome::Passed { partial: 1.0 });
    }

    #[test]
    fn response_from_wrong_blobber_is_rejected() {
        let store = InMemoryTrieNodeStore::new();
        let mut access = TrieStateAccess::new(&store, None);
        let config = StorageContractConfig::default();
        let allocation_id = setup_allocation(&mut access, &config);

        let challenge = StorageChallenge {
            id: "ch-2".into(),
            allocation_id,
            blobber_id: account(10),
            validators: vec![account(20)],
            created: Timestamp(1_000),
            status: ChallengeStatus::Open,
        };
        access
            .insert(&challenge_key(&challenge.id), &challenge.encode())
            .expect("insert challenge");

        let resolver = MapResolver(BTreeMap::new());
        let result = verify_response(&access, &resolver, "ch-2", &account(11), &[], Timestamp(1_100), 600);
        assert!(result.is_err());
    }

    #[test]
    fn stale_pass_is_treated_as_failure() {
        let store = InMemoryTrieNodeStore::new();
        let mut access = TrieStateAccess::new(&store, None);
        let config = StorageContractConfig::default();
        let allocation_id = setup_allocation(&mut access, &config);

        let v1 = EcdsaKeyPair::generate();
        let challenge = StorageChallenge {
            id: "ch-3".into(),
            allocation_id,
            blobber_id: account(10),
            validators: vec![account(20)],
            created: Timestamp(1_000),
            status: ChallengeStatus::Open,
        };
        access
            .insert(&challenge_key(&challenge.id), &challenge.encode())
            .expect("insert challenge");

        let tickets = vec![sign_ticket(&v1, "ch-3", account(20), true)];
        let mut keys = BTreeMap::new();
        keys.insert(account(20), v1.public_key_bytes());
        let resolver = MapResolver(keys);

        // well past created + challenge_completion_time
        let (outcome, _) =
            verify_response(&access, &resolver, "ch-3", &account(10), &tickets, Timestamp(10_000), 600)
                .expect("verify_response");
        assert_eq!(outcome, ChallengeOutcome::Failed);
    }
}
