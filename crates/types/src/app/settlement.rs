//! Token movement primitives emitted by a state context during block
//! execution (spec.md §4.2).

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::AccountId;

/// A client-to-client token movement accumulated by a state context.
///
/// `add_transfer` guards that `from` or `to` is the executing transaction's
/// identity, preventing a contract from moving funds it was not authorized
/// to move (spec.md §4.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Transfer {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: u128,
}

/// A token issuance accumulated by a state context. `minter` must be in an
/// allow-list enforced by the state context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Mint {
    pub minter: AccountId,
    pub to: AccountId,
    pub amount: u128,
}
