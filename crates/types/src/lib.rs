//! # Meridian Types
//!
//! Core wire and state data structures shared across every Meridian crate:
//! account/chain identifiers, block and round entities, the dual wire codec,
//! and the abstract configuration keys consulted by the consensus and
//! storage-contract layers.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

/// Core application-level entities: accounts, blocks, rounds, magic blocks,
/// DKG messages, settlement, and penalties.
pub mod app;
/// The dual MessagePack/JSON wire codec and the canonical internal codec.
pub mod codec;
/// Abstract, file-loadable configuration for the consensus and
/// storage-contract layers.
pub mod config;
/// Shared error primitives (`CoreError`, `ErrorCode`).
pub mod error;
/// Canonical trie-key builders for every entity family stored in the MPT.
pub mod keys;

/// A curated set of the most commonly used types.
pub mod prelude {
    pub use crate::app::{AccountId, Block, ChainId, MagicBlock, Txn};
    pub use crate::codec::{Codec, WireError};
    pub use crate::config::Config;
    pub use crate::error::{CoreError, ErrorCode};
}
