//! The delegated stake-pool primitive (spec.md §4.3): bonded collateral,
//! allocation offers, proportional reward distribution, and slashing,
//! shared by every provider role (blobber, validator, miner).
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

pub mod pool;
pub mod ratio;

pub mod prelude {
    pub use crate::pool::{Offer, OfferStatus, RewardDistribution, SlashOutcome, StakeError, StakePool};
    pub use crate::ratio::Ratio;
}
