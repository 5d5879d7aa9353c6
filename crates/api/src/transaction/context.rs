//! The stable, read-only context handed to a smart-contract dispatch
//! method during execution (spec.md §4.2, §6).

use meridian_types::app::{AccountId, ChainId, Timestamp};

/// Read-only execution context threaded through a transaction's dispatch
/// call. Distinct from `StateContext`, which carries the mutable,
/// effect-buffering half of the call.
#[derive(Debug, Clone, Copy)]
pub struct TxContext {
    /// The round this transaction is being executed as part of.
    pub round: u64,
    /// The deterministic timestamp of the block under construction, taken
    /// from its header rather than wall-clock time so that replaying the
    /// same block always reaches the same outcome (spec.md §8).
    pub block_timestamp: Timestamp,
    pub chain_id: ChainId,
    /// The account that signed the transaction currently executing.
    pub signer: AccountId,
    /// Hash of the currently executing transaction, used by contracts that
    /// derive deterministic ids or PRNG seeds from it (spec.md §4.7.2).
    pub txn_hash: [u8; 32],
    /// Hash of the block's parent, the other half of the challenge PRNG
    /// seed (spec.md §4.7.2).
    pub prev_block_hash: [u8; 32],
    /// Token value attached to the currently executing transaction.
    pub value: u128,
    /// `true` when this call is a speculative fee/validity check that must
    /// not be allowed to leave any committed side effects.
    pub simulation: bool,
}
