//! Applies the token movements a block's transactions accumulated
//! (`meridian_state::context::TxStateContext::take_transfers`/
//! `take_mints`) to account balances once that block finalizes
//! (spec.md §4.5 `finalize`).

use meridian_api::state::{StateAccess, StateError};
use meridian_types::app::{AccountId, Mint, Transfer};
use meridian_types::keys::balance_key;
use parity_scale_codec::{Decode, Encode};

fn read_balance(state: &dyn StateAccess, account: &AccountId) -> Result<u128, StateError> {
    match state.get(&balance_key(account))? {
        Some(bytes) => u128::decode(&mut bytes.as_slice())
            .map_err(|e| StateError::InvalidValue(e.to_string())),
        None => Ok(0),
    }
}

fn write_balance(state: &mut dyn StateAccess, account: &AccountId, amount: u128) -> Result<(), StateError> {
    state.insert(&balance_key(account), &amount.encode())
}

/// Debits `transfer.from` and credits `transfer.to`. Fails without side
/// effects if the sender's balance is insufficient.
pub fn apply_transfer(state: &mut dyn StateAccess, transfer: &Transfer) -> Result<(), StateError> {
    let sender_balance = read_balance(state, &transfer.from)?;
    let new_sender_balance = sender_balance
        .checked_sub(transfer.amount)
        .ok_or_else(|| StateError::Backend("insufficient balance for transfer".into()))?;
    let receiver_balance = read_balance(state, &transfer.to)?;
    let new_receiver_balance = receiver_balance
        .checked_add(transfer.amount)
        .ok_or_else(|| StateError::Backend("balance overflow on transfer".into()))?;
    write_balance(state, &transfer.from, new_sender_balance)?;
    write_balance(state, &transfer.to, new_receiver_balance)
}

/// Credits `mint.to`. Authorization (minter allow-list membership) is
/// enforced earlier, at `TxStateContext::add_mint` time.
pub fn apply_mint(state: &mut dyn StateAccess, mint: &Mint) -> Result<(), StateError> {
    let balance = read_balance(state, &mint.to)?;
    let new_balance = balance
        .checked_add(mint.amount)
        .ok_or_else(|| StateError::Backend("balance overflow on mint".into()))?;
    write_balance(state, &mint.to, new_balance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_state::trie_backend::TrieStateAccess;
    use meridian_trie::store::InMemoryTrieNodeStore;

    #[test]
    fn transfer_moves_balance_between_accounts() {
        let store = InMemoryTrieNodeStore::new();
        let mut access = TrieStateAccess::new(&store, None);
        let alice = AccountId::from_public_key(b"alice");
        let bob = AccountId::from_public_key(b"bob");
        write_balance(&mut access, &alice, 100).expect("seed");

        let transfer = Transfer {
            from: alice,
            to: bob,
            amount: 40,
        };
        apply_transfer(&mut access, &transfer).expect("transfer applied");

        assert_eq!(read_balance(&access, &alice).unwrap(), 60);
        assert_eq!(read_balance(&access, &bob).unwrap(), 40);
    }

    #[test]
    fn transfer_exceeding_balance_is_rejected() {
        let store = InMemoryTrieNodeStore::new();
        let mut access = TrieStateAccess::new(&store, None);
        let alice = AccountId::from_public_key(b"alice");
        let bob = AccountId::from_public_key(b"bob");

        let transfer = Transfer {
            from: alice,
            to: bob,
            amount: 1,
        };
        assert!(apply_transfer(&mut access, &transfer).is_err());
    }

    #[test]
    fn mint_credits_recipient() {
        let store = InMemoryTrieNodeStore::new();
        let mut access = TrieStateAccess::new(&store, None);
        let alice = AccountId::from_public_key(b"alice");
        let mint = Mint {
            minter: AccountId::from_public_key(b"treasury"),
            to: alice,
            amount: 250,
        };
        apply_mint(&mut access, &mint).expect("mint applied");
        assert_eq!(read_balance(&access, &alice).unwrap(), 250);
    }
}
