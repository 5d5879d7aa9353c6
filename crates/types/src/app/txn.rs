//! The transaction payload carried in a block (spec.md §6).

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::AccountId;

/// A transaction addressed either to a plain account (a transfer) or to a
/// smart-contract address, in which case it carries a `{function_name,
/// input}` pair the contract's dispatcher matches on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum TxnPayload {
    Transfer { amount: u128 },
    SmartContract { function_name: String, input: Vec<u8> },
}

/// A signed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Txn {
    pub hash: [u8; 32],
    pub client_id: AccountId,
    pub to_client_id: AccountId,
    pub nonce: u64,
    pub fee: u128,
    pub payload: TxnPayload,
    /// ECDSA signature of `client_id` over the canonical encoding of every
    /// other field.
    pub signature: Vec<u8>,
}

impl Txn {
    /// The value being moved by this transaction, `0` for smart-contract
    /// calls that do not also attach a funding transfer.
    pub fn value(&self) -> u128 {
        match &self.payload {
            TxnPayload::Transfer { amount } => *amount,
            TxnPayload::SmartContract { .. } => 0,
        }
    }
}
