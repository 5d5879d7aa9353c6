//! The delegated stake-pool primitive shared by every provider role
//! (blobber, validator, miner) — spec.md §4.3, generalized from the
//! teacher's `ProviderRecord`/`stake` field (`services::provider_registry`)
//! into a standalone container with delegate accounting, offered
//! collateral, reward distribution, and slashing.

use std::collections::BTreeMap;

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use meridian_types::app::AccountId;
use meridian_types::error::ErrorCode;

use crate::ratio::Ratio;

/// `amount * numerator / denominator` in `u128`, used for delegate-balance
/// weighted splits where `numerator`/`denominator` (stake balances) can
/// exceed `u64` and so cannot go through `Ratio`'s `u64` fields.
fn weighted_share(amount: u128, numerator: u128, denominator: u128) -> u128 {
    if denominator == 0 {
        return 0;
    }
    match amount.checked_mul(numerator) {
        Some(product) => product / denominator,
        None => {
            // Fall back to a lower-precision division first to avoid
            // overflowing the intermediate product for very large pools.
            (amount / denominator).saturating_mul(numerator)
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakeError {
    #[error("pool has insufficient free stake to cover offer of {requested}, free is {free}")]
    InsufficientFreeStake { requested: u128, free: u128 },
    #[error("no offer found for allocation {0}")]
    OfferNotFound(String),
    #[error("offer for allocation {0} is already released or slashed")]
    OfferNotActive(String),
    #[error("token amount overflowed during arithmetic")]
    Overflow,
}

impl ErrorCode for StakeError {
    fn code(&self) -> &'static str {
        match self {
            Self::InsufficientFreeStake { .. } => "STAKE_INSUFFICIENT_FREE",
            Self::OfferNotFound(_) => "STAKE_OFFER_NOT_FOUND",
            Self::OfferNotActive(_) => "STAKE_OFFER_NOT_ACTIVE",
            Self::Overflow => "STAKE_OVERFLOW",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum OfferStatus {
    Active,
    Released,
    Slashed,
}

/// One allocation's claim on a provider's pool, created when the provider
/// is selected for that allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Offer {
    pub allocation_id: String,
    pub lock: u128,
    /// Round timestamp at which the offer becomes eligible for release.
    pub expire: u64,
    pub status: OfferStatus,
}

/// Outcome of a `distribute_rewards` call, for the caller to turn into
/// actual `Mint`/`Transfer` effects and events.
#[derive(Debug, Clone, Default)]
pub struct RewardDistribution {
    pub provider_amount: u128,
    pub delegate_amounts: BTreeMap<AccountId, u128>,
}

/// Outcome of a `slash` call.
#[derive(Debug, Clone, Default)]
pub struct SlashOutcome {
    pub total_slashed: u128,
    pub delegate_amounts: BTreeMap<AccountId, u128>,
}

/// A provider's delegated stake pool (spec.md §4.3).
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct StakePool {
    pub provider_id: AccountId,
    /// Locked balance per delegate, not counting accumulated rewards.
    pub delegates: BTreeMap<AccountId, u128>,
    /// Reward balance accumulated per delegate, withdrawable separately
    /// from locked stake.
    pub delegate_rewards: BTreeMap<AccountId, u128>,
    pub provider_rewards: u128,
    pub total_offers: u128,
    pub offers: BTreeMap<String, Offer>,
    pub service_charge: Ratio,
}

impl StakePool {
    pub fn new(provider_id: AccountId, service_charge: Ratio) -> Self {
        Self {
            provider_id,
            delegates: BTreeMap::new(),
            delegate_rewards: BTreeMap::new(),
            provider_rewards: 0,
            total_offers: 0,
            offers: BTreeMap::new(),
            service_charge,
        }
    }

    fn total_delegated(&self) -> u128 {
        self.delegates.values().sum()
    }

    /// Free stake available to back new offers: total delegated minus what
    /// is already committed.
    pub fn free_stake(&self) -> u128 {
        self.total_delegated().saturating_sub(self.total_offers)
    }

    /// Locks `amount` of new delegated stake from `delegate`.
    pub fn lock(&mut self, delegate: AccountId, amount: u128) {
        *self.delegates.entry(delegate).or_insert(0) += amount;
    }

    /// Unlocks up to `amount` of `delegate`'s stake that is not backing an
    /// active offer. Returns the amount actually unlocked.
    pub fn unlock(&mut self, delegate: AccountId, amount: u128) -> u128 {
        let free = self.free_stake();
        let delegate_balance = self.delegates.get(&delegate).copied().unwrap_or(0);
        let unlockable = amount.min(free).min(delegate_balance);
        if let Some(balance) = self.delegates.get_mut(&delegate) {
            *balance -= unlockable;
            if *balance == 0 {
                self.delegates.remove(&delegate);
            }
        }
        unlockable
    }

    pub fn find_offer(&self, allocation_id: &str) -> Option<&Offer> {
        self.offers.get(allocation_id)
    }

    /// Adds a collateral offer for `allocation_id`, failing if the pool's
    /// free stake cannot cover it.
    pub fn add_offer(
        &mut self,
        allocation_id: impl Into<String>,
        amount: u128,
        expire: u64,
    ) -> Result<(), StakeError> {
        let free = self.free_stake();
        if amount > free {
            return Err(StakeError::InsufficientFreeStake {
                requested: amount,
                free,
            });
        }
        let allocation_id = allocation_id.into();
        self.total_offers = self
            .total_offers
            .checked_add(amount)
            .ok_or(StakeError::Overflow)?;
        self.offers.insert(
            allocation_id.clone(),
            Offer {
                allocation_id,
                lock: amount,
                expire,
                status: OfferStatus::Active,
            },
        );
        Ok(())
    }

    /// Extends an existing active offer's lock and expiry (spec.md §4.7.1
    /// allocation extension).
    pub fn extend_offer(
        &mut self,
        allocation_id: &str,
        additional_amount: u128,
        new_expire: u64,
    ) -> Result<(), StakeError> {
        let free = self.free_stake();
        if additional_amount > free {
            return Err(StakeError::InsufficientFreeStake {
                requested: additional_amount,
                free,
            });
        }
        let offer = self
            .offers
            .get_mut(allocation_id)
            .ok_or_else(|| StakeError::OfferNotFound(allocation_id.to_string()))?;
        if offer.status != OfferStatus::Active {
            return Err(StakeError::OfferNotActive(allocation_id.to_string()));
        }
        offer.lock = offer.lock.checked_add(additional_amount).ok_or(StakeError::Overflow)?;
        offer.expire = new_expire;
        self.total_offers = self
            .total_offers
            .checked_add(additional_amount)
            .ok_or(StakeError::Overflow)?;
        Ok(())
    }

    /// Releases an offer (allocation expired or finalized), freeing its
    /// lock back into the pool's free stake.
    pub fn release_offer(&mut self, allocation_id: &str) -> Result<(), StakeError> {
        let offer = self
            .offers
            .get_mut(allocation_id)
            .ok_or_else(|| StakeError::OfferNotFound(allocation_id.to_string()))?;
        if offer.status != OfferStatus::Active {
            return Err(StakeError::OfferNotActive(allocation_id.to_string()));
        }
        self.total_offers = self.total_offers.saturating_sub(offer.lock);
        offer.status = OfferStatus::Released;
        Ok(())
    }

    /// Splits `amount` between the provider's service charge and its
    /// delegates proportionally to delegate balance. Any amount that
    /// cannot be distributed to delegates (no delegates present, or
    /// per-delegate rounding) is absorbed by the provider.
    pub fn distribute_rewards(&mut self, amount: u128) -> RewardDistribution {
        let service_charge = self.service_charge.apply(amount).unwrap_or(amount);
        let delegate_total = amount.saturating_sub(service_charge);

        let mut result = RewardDistribution {
            provider_amount: service_charge,
            delegate_amounts: BTreeMap::new(),
        };

        let total_delegated = self.total_delegated();
        if total_delegated == 0 || delegate_total == 0 {
            result.provider_amount = result.provider_amount.saturating_add(delegate_total);
            self.provider_rewards = self.provider_rewards.saturating_add(result.provider_amount);
            return result;
        }

        let mut distributed = 0u128;
        for (delegate, balance) in &self.delegates {
            let share = weighted_share(delegate_total, *balance, total_delegated);
            distributed = distributed.saturating_add(share);
            result.delegate_amounts.insert(*delegate, share);
        }

        let residue = delegate_total.saturating_sub(distributed);
        if residue > 0 {
            if let Some((first_delegate, _)) = self.delegates.iter().next() {
                *result.delegate_amounts.entry(*first_delegate).or_insert(0) += residue;
            } else {
                result.provider_amount = result.provider_amount.saturating_add(residue);
            }
        }

        for (delegate, share) in &result.delegate_amounts {
            *self.delegate_rewards.entry(*delegate).or_insert(0) += share;
        }
        self.provider_rewards = self.provider_rewards.saturating_add(result.provider_amount);
        result
    }

    /// Removes `fraction` of every active offer's lock, proportionally
    /// reducing delegate balances by the same fraction of their stake. An
    /// offer whose lock is fully removed transitions to `Slashed`.
    pub fn slash(&mut self, fraction: Ratio) -> SlashOutcome {
        let mut total_slashed = 0u128;
        for offer in self.offers.values_mut() {
            if offer.status != OfferStatus::Active {
                continue;
            }
            let cut = fraction.apply(offer.lock).unwrap_or(0).min(offer.lock);
            if cut == 0 {
                continue;
            }
            offer.lock -= cut;
            total_slashed = total_slashed.saturating_add(cut);
            if offer.lock == 0 {
                offer.status = OfferStatus::Slashed;
            }
        }
        self.total_offers = self.total_offers.saturating_sub(total_slashed);

        let mut outcome = SlashOutcome {
            total_slashed,
            delegate_amounts: BTreeMap::new(),
        };
        if total_slashed == 0 {
            return outcome;
        }

        let total_delegated = self.total_delegated();
        if total_delegated == 0 {
            return outcome;
        }

        let mut removed = 0u128;
        let delegate_ids: Vec<AccountId> = self.delegates.keys().copied().collect();
        for delegate in &delegate_ids {
            let balance = self.delegates.get(delegate).copied().unwrap_or(0);
            let cut = weighted_share(total_slashed, balance, total_delegated).min(balance);
            removed = removed.saturating_add(cut);
            outcome.delegate_amounts.insert(*delegate, cut);
            if let Some(b) = self.delegates.get_mut(delegate) {
                *b -= cut;
                if *b == 0 {
                    self.delegates.remove(delegate);
                }
            }
        }

        let residue = total_slashed.saturating_sub(removed);
        if residue > 0 {
            if let Some(first) = delegate_ids.first() {
                if let Some(balance) = self.delegates.get_mut(first) {
                    let extra = residue.min(*balance);
                    *balance -= extra;
                    *outcome.delegate_amounts.entry(*first).or_insert(0) += extra;
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(byte: u8) -> AccountId {
        AccountId([byte; 32])
    }

    #[test]
    fn add_offer_fails_when_exceeding_free_stake() {
        let mut pool = StakePool::new(account(1), Ratio::new(1, 10));
        pool.lock(account(2), 100);
        let result = pool.add_offer("alloc-1", 200, 1000);
        assert!(result.is_err());
    }

    #[test]
    fn add_offer_increases_total_offers_and_is_findable() {
        let mut pool = StakePool::new(account(1), Ratio::new(1, 10));
        pool.lock(account(2), 100);
        pool.add_offer("alloc-1", 60, 1000).expect("add_offer");
        assert_eq!(pool.total_offers, 60);
        assert_eq!(pool.free_stake(), 40);
        assert!(pool.find_offer("alloc-1").is_some());
    }

    #[test]
    fn release_offer_frees_stake_back() {
        let mut pool = StakePool::new(account(1), Ratio::new(1, 10));
        pool.lock(account(2), 100);
        pool.add_offer("alloc-1", 60, 1000).expect("add_offer");
        pool.release_offer("alloc-1").expect("release_offer");
        assert_eq!(pool.total_offers, 0);
        assert_eq!(pool.free_stake(), 100);
        assert_eq!(pool.find_offer("alloc-1").unwrap().status, OfferStatus::Released);
    }

    #[test]
    fn distribute_rewards_splits_by_service_charge_and_delegate_balance() {
        let mut pool = StakePool::new(account(1), Ratio::new(1, 10));
        pool.lock(account(2), 300);
        pool.lock(account(3), 700);

        let result = pool.distribute_rewards(1000);
        assert_eq!(result.provider_amount, 100);
        assert_eq!(result.delegate_amounts.get(&account(2)), Some(&270));
        assert_eq!(result.delegate_amounts.get(&account(3)), Some(&630));
    }

    #[test]
    fn distribute_rewards_with_no_delegates_goes_entirely_to_provider() {
        let mut pool = StakePool::new(account(1), Ratio::new(1, 10));
        let result = pool.distribute_rewards(1000);
        assert_eq!(result.provider_amount, 1000);
        assert!(result.delegate_amounts.is_empty());
    }

    #[test]
    fn slash_reduces_active_offer_and_delegate_balances() {
        let mut pool = StakePool::new(account(1), Ratio::new(1, 10));
        pool.lock(account(2), 100);
        pool.add_offer("alloc-1", 100, 1000).expect("add_offer");

        let outcome = pool.slash(Ratio::new(1, 2));
        assert_eq!(outcome.total_slashed, 50);
        assert_eq!(pool.total_offers, 50);
        assert_eq!(pool.find_offer("alloc-1").unwrap().status, OfferStatus::Active);
        assert_eq!(pool.delegates.get(&account(2)), Some(&50));
    }

    #[test]
    fn slash_to_zero_marks_offer_slashed() {
        let mut pool = StakePool::new(account(1), Ratio::new(1, 10));
        pool.lock(account(2), 100);
        pool.add_offer("alloc-1", 100, 1000).expect("add_offer");

        pool.slash(Ratio::ONE);
        assert_eq!(pool.find_offer("alloc-1").unwrap().status, OfferStatus::Slashed);
        assert_eq!(pool.total_offers, 0);
    }
}
