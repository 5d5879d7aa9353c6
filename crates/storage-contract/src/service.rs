//! The `BlockchainService` dispatch seam for the storage contract
//! (spec.md §4.7): routes a `"method@version"` call onto the allocation
//! and challenge lifecycle functions, bridging the crate's own
//! `StorageError` into the shared `CoreError`.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use parity_scale_codec::{Decode, Encode};

use meridian_api::error::CoreError;
use meridian_api::services::BlockchainService;
use meridian_api::state::{StateAccess, StateContext, StateError, StateScanItem};
use meridian_api::transaction::context::TxContext;
use meridian_state::prelude::PartitionedSet;
use meridian_types::app::AccountId;
use meridian_types::config::StorageContractConfig;
use meridian_types::keys::{CHALLENGE_READY_PARTITION, VALIDATOR_PARTITION};

use crate::allocation::{self, FreeAllocationRequest, NewAllocationRequest};
use crate::challenge::{self, ChallengeOutcome, ValidatorKeyResolver};
use crate::error::StorageError;
use crate::types::{BlobberPartitionEntry, ValidationTicket};

/// The contract's stable method identifier (spec.md §6's `SmartContract`
/// payload addresses it by this string).
pub const SERVICE_ID: &str = "storagesc";

/// Reborrows a `&mut dyn StateContext` as `StateAccess` without an
/// unstable trait-object upcast: every call goes straight through to the
/// wrapped context's own (supertrait) methods.
struct StateAccessView<'a>(&'a mut dyn StateContext);

impl StateAccess for StateAccessView<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        self.0.get(key)
    }

    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        self.0.insert(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        self.0.delete(key)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<StateScanItem>, StateError> {
        self.0.prefix_scan(prefix)
    }
}

#[derive(Encode, Decode)]
struct UpdateAllocationParams {
    allocation_id: String,
    extra_size: i64,
    extra_duration_seconds: i64,
}

#[derive(Encode, Decode)]
struct CloseAllocationParams {
    allocation_id: String,
}

#[derive(Encode, Decode)]
struct FinalizeAllocationParams {
    allocation_id: String,
}

#[derive(Encode, Decode)]
struct GenerateChallengeParams {
    id: String,
}

#[derive(Encode, Decode)]
struct ChallengeResponseParams {
    challenge_id: String,
    tickets: Vec<ValidationTicket>,
}

#[derive(Encode, Decode)]
struct SweepExpiredParams {
    allocation_id: String,
    blobber_id: AccountId,
}

/// Looks validator signing keys up from an in-memory registry populated at
/// node startup (validator onboarding itself is out of this contract's
/// scope; spec.md §4.7.2 only specifies how a registered key is used).
#[derive(Default)]
pub struct InMemoryValidatorKeys {
    keys: RwLock<BTreeMap<AccountId, Vec<u8>>>,
}

impl InMemoryValidatorKeys {
    pub fn register(&self, validator: AccountId, public_key: Vec<u8>) {
        self.keys
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(validator, public_key);
    }
}

impl ValidatorKeyResolver for InMemoryValidatorKeys {
    fn public_key_of(&self, validator: &AccountId) -> Option<Vec<u8>> {
        self.keys
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(validator)
            .cloned()
    }
}

/// The storage contract's dispatch table and configuration.
pub struct StorageContractService {
    config: StorageContractConfig,
    validator_keys: InMemoryValidatorKeys,
}

impl StorageContractService {
    pub fn new(config: StorageContractConfig, validator_keys: InMemoryValidatorKeys) -> Self {
        Self {
            config,
            validator_keys,
        }
    }

    fn decode<T: Decode>(input: &[u8]) -> Result<T, CoreError> {
        let mut cursor = input;
        T::decode(&mut cursor).map_err(|e| CoreError::Codec(e.to_string()))
    }
}

fn ok(bytes: impl Encode) -> Result<Vec<u8>, CoreError> {
    Ok(bytes.encode())
}

#[async_trait]
impl BlockchainService for StorageContractService {
    fn id(&self) -> &str {
        SERVICE_ID
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn dispatch(
        &self,
        state: &mut dyn StateContext,
        method_at_version: &str,
        input: &[u8],
        ctx: &TxContext,
    ) -> Result<Vec<u8>, CoreError> {
        let mut view = StateAccessView(state);
        match method_at_version {
            "new_allocation@v1" => {
                let request: NewAllocationRequest = Self::decode(input)?;
                let allocation =
                    allocation::new_allocation_request(&mut view, &self.config, ctx, request)
                        .map_err(CoreError::from)?;
                ok(allocation)
            }
            "free_allocation@v1" => {
                let request: FreeAllocationRequest = Self::decode(input)?;
                let allocation =
                    allocation::free_allocation_request(&mut view, &self.config, ctx, request)
                        .map_err(CoreError::from)?;
                ok(allocation)
            }
            "update_allocation@v1" => {
                let params: UpdateAllocationParams = Self::decode(input)?;
                let allocation = allocation::update_allocation_request(
                    &mut view,
                    &self.config,
                    &params.allocation_id,
                    params.extra_size,
                    params.extra_duration_seconds,
                )
                .map_err(CoreError::from)?;
                ok(allocation)
            }
            "close_allocation@v1" => {
                let params: CloseAllocationParams = Self::decode(input)?;
                let allocation =
                    allocation::close_allocation(&mut view, &params.allocation_id, ctx.block_timestamp)
                        .map_err(CoreError::from)?;
                ok(allocation)
            }
            "finalize_allocation@v1" => {
                let params: FinalizeAllocationParams = Self::decode(input)?;
                let payout =
                    allocation::finalize_allocation(&mut view, &params.allocation_id, ctx.block_timestamp)
                        .map_err(CoreError::from)?;
                ok(payout)
            }
            "generate_challenge@v1" => {
                let params: GenerateChallengeParams = Self::decode(input)?;
                let seed = challenge::challenge_seed(&ctx.txn_hash, &ctx.prev_block_hash);
                let challenge_ready: PartitionedSet<BlobberPartitionEntry> =
                    PartitionedSet::new(CHALLENGE_READY_PARTITION);
                let validators: PartitionedSet<AccountId> = PartitionedSet::new(VALIDATOR_PARTITION);
                let generated = challenge::generate_challenge(
                    &mut view,
                    params.id,
                    seed,
                    &challenge_ready,
                    &validators,
                    ctx.block_timestamp,
                )
                .map_err(CoreError::from)?;
                if let Some(created) = &generated {
                    let allocation = allocation::get_allocation(&view, &created.allocation_id)
                        .map_err(CoreError::from)?;
                    challenge::sweep_expired(
                        &mut view,
                        &created.allocation_id,
                        &created.blobber_id,
                        allocation.challenge_completion_time,
                        ctx.block_timestamp,
                    )
                    .map_err(CoreError::from)?;
                }
                ok(generated)
            }
            "challenge_response@v1" => {
                let params: ChallengeResponseParams = Self::decode(input)?;
                let pending = challenge::get_challenge(&view, &params.challenge_id)
                    .map_err(CoreError::from)?;
                let allocation = allocation::get_allocation(&view, &pending.allocation_id)
                    .map_err(CoreError::from)?;
                let (outcome, challenge) = challenge::verify_response(
                    &view,
                    &self.validator_keys,
                    &params.challenge_id,
                    &ctx.signer,
                    &params.tickets,
                    ctx.block_timestamp,
                    allocation.challenge_completion_time,
                )
                .map_err(CoreError::from)?;
                if !matches!(outcome, ChallengeOutcome::Pending) {
                    let responders: Vec<AccountId> = params
                        .tickets
                        .iter()
                        .filter(|t| challenge.validators.contains(&t.validator_id))
                        .map(|t| t.validator_id)
                        .collect();
                    challenge::settle_challenge(
                        &mut view,
                        &self.config,
                        &challenge,
                        &outcome,
                        &responders,
                        ctx.block_timestamp,
                    )
                    .map_err(CoreError::from)?;
                }
                ok(format!("{outcome:?}"))
            }
            "sweep_expired@v1" => {
                let params: SweepExpiredParams = Self::decode(input)?;
                let allocation = allocation::get_allocation(&view, &params.allocation_id)
                    .map_err(CoreError::from)?;
                let reports = challenge::sweep_expired(
                    &mut view,
                    &params.allocation_id,
                    &params.blobber_id,
                    allocation.challenge_completion_time,
                    ctx.block_timestamp,
                )
                .map_err(CoreError::from)?;
                ok(reports)
            }
            other => Err(StorageError::UnsupportedMethod(other.to_string()).into()),
        }
    }
}
