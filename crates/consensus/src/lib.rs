//! The round and chain state machines (spec.md §4.4, §4.5): VRF-driven
//! randomness, block proposal and verification-ticket collection,
//! notarization, and finalization with fork resolution.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

pub mod chain;
pub mod error;
pub mod key_resolver;
pub mod ledger;
pub mod round;

pub mod prelude {
    pub use crate::chain::{BlockSettlement, ChainMachine, LatestFinalizedBlock};
    pub use crate::error::ConsensusError;
    pub use crate::key_resolver::{PartyKeyResolver, StaticKeyResolver};
    pub use crate::round::{vrf_message, Round, RoundMachine, RoundState};
}
