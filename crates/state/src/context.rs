//! `TxStateContext`: the sandboxed per-transaction view handed to smart
//! contract dispatch methods (spec.md §4.2). Wraps any `StateAccess` and
//! buffers transfers, mints, and events so a contract can never apply a
//! side effect directly; the block executor drains the buffers and applies
//! them after the call returns successfully.

use std::collections::BTreeSet;

use meridian_api::state::{StateAccess, StateContext, StateError, StateScanItem};
use meridian_types::app::{AccountId, Event, Mint, Transfer};

pub struct TxStateContext<'a> {
    inner: &'a mut dyn StateAccess,
    signer: AccountId,
    mint_allowlist: BTreeSet<AccountId>,
    block_round: u64,
    transfers: Vec<Transfer>,
    mints: Vec<Mint>,
    events: Vec<Event>,
    next_sequence: u64,
}

impl<'a> TxStateContext<'a> {
    pub fn new(
        inner: &'a mut dyn StateAccess,
        signer: AccountId,
        block_round: u64,
        mint_allowlist: BTreeSet<AccountId>,
    ) -> Self {
        Self {
            inner,
            signer,
            mint_allowlist,
            block_round,
            transfers: Vec::new(),
            mints: Vec::new(),
            events: Vec::new(),
            next_sequence: 0,
        }
    }

    pub fn signer(&self) -> AccountId {
        self.signer
    }
}

impl StateAccess for TxStateContext<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        self.inner.get(key)
    }

    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        self.inner.insert(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        self.inner.delete(key)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<StateScanItem>, StateError> {
        self.inner.prefix_scan(prefix)
    }
}

impl StateContext for TxStateContext<'_> {
    fn add_transfer(&mut self, transfer: Transfer) -> Result<(), StateError> {
        if transfer.from != self.signer && transfer.to != self.signer {
            return Err(StateError::Unauthorized(format!(
                "transfer between {} and {} does not involve the executing signer {}",
                transfer.from, transfer.to, self.signer
            )));
        }
        self.transfers.push(transfer);
        Ok(())
    }

    fn add_mint(&mut self, mint: Mint) -> Result<(), StateError> {
        if !self.mint_allowlist.contains(&mint.minter) {
            return Err(StateError::Unauthorized(format!(
                "{} is not an allow-listed minter",
                mint.minter
            )));
        }
        self.mints.push(mint);
        Ok(())
    }

    fn emit_event(&mut self, mut event: Event) {
        event.block_round = self.block_round;
        event.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.events.push(event);
    }

    fn take_transfers(&mut self) -> Vec<Transfer> {
        std::mem::take(&mut self.transfers)
    }

    fn take_mints(&mut self) -> Vec<Mint> {
        std::mem::take(&mut self.mints)
    }

    fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie_backend::TrieStateAccess;
    use meridian_trie::prelude::InMemoryTrieNodeStore;

    fn account(byte: u8) -> AccountId {
        AccountId([byte; 32])
    }

    #[test]
    fn transfer_not_involving_signer_is_rejected() {
        let store = InMemoryTrieNodeStore::new();
        let mut access = TrieStateAccess::new(&store, None);
        let mut ctx = TxStateContext::new(&mut access, account(1), 7, BTreeSet::new());

        let result = ctx.add_transfer(Transfer {
            from: account(2),
            to: account(3),
            amount: 10,
        });
        assert!(result.is_err());
    }

    #[test]
    fn transfer_involving_signer_is_buffered() {
        let store = InMemoryTrieNodeStore::new();
        let mut access = TrieStateAccess::new(&store, None);
        let mut ctx = TxStateContext::new(&mut access, account(1), 7, BTreeSet::new());

        ctx.add_transfer(Transfer {
            from: account(1),
            to: account(3),
            amount: 10,
        })
        .expect("authorized transfer");
        assert_eq!(ctx.take_transfers().len(), 1);
    }

    #[test]
    fn mint_outside_allowlist_is_rejected() {
        let store = InMemoryTrieNodeStore::new();
        let mut access = TrieStateAccess::new(&store, None);
        let mut ctx = TxStateContext::new(&mut access, account(1), 7, BTreeSet::new());

        let result = ctx.add_mint(Mint {
            minter: account(1),
            to: account(2),
            amount: 5,
        });
        assert!(result.is_err());
    }

    #[test]
    fn events_get_sequential_numbers_within_the_block() {
        let store = InMemoryTrieNodeStore::new();
        let mut access = TrieStateAccess::new(&store, None);
        let mut ctx = TxStateContext::new(&mut access, account(1), 42, BTreeSet::new());

        ctx.emit_event(Event {
            block_round: 0,
            sequence: 0,
            event_type: "allocation".into(),
            tag: "created".into(),
            entity_id: "a1".into(),
            payload: vec![],
        });
        ctx.emit_event(Event {
            block_round: 0,
            sequence: 0,
            event_type: "allocation".into(),
            tag: "updated".into(),
            entity_id: "a1".into(),
            payload: vec![],
        });

        let events = ctx.take_events();
        assert_eq!(events[0].block_round, 42);
        assert_eq!(events[0].sequence, 0);
        assert_eq!(events[1].sequence, 1);
    }
}
