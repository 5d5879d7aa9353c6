//! Ordered chain of rounds: latest finalized block tracking, notarization
//! bookkeeping, finalization, and fork resolution (spec.md §4.5).

use std::collections::BTreeMap;

use meridian_api::state::StateAccess;
use meridian_trie::store::TrieNodeStore;
use meridian_types::app::{Block, Event, Mint, Transfer};

use crate::error::ConsensusError;
use crate::ledger::{apply_mint, apply_transfer};
use crate::round::{Round, RoundState};

/// Token movements and events a block's transactions accumulated during
/// execution (produced by applying the block against a
/// `meridian_state::context::TxStateContext` and draining it), carried
/// alongside the block until it finalizes.
#[derive(Debug, Clone, Default)]
pub struct BlockSettlement {
    pub transfers: Vec<Transfer>,
    pub mints: Vec<Mint>,
    pub events: Vec<Event>,
}

/// Latest finalized block plus the ticket that finalized it.
#[derive(Debug, Clone)]
pub struct LatestFinalizedBlock {
    pub round: u64,
    pub hash: [u8; 32],
}

/// The chain's in-memory view: rounds, the finalized tip, and pending
/// settlement data for blocks awaiting finalization.
pub struct ChainMachine {
    current_round: u64,
    lfb: Option<LatestFinalizedBlock>,
    rounds: BTreeMap<u64, Round>,
    /// Settlement data registered for a round's blocks via
    /// `register_settlement`, consumed by `finalize`.
    pending_settlement: BTreeMap<[u8; 32], BlockSettlement>,
    /// How far behind the chain's current round may trail the sharders'
    /// reported LFB round before new-round starts are suspended
    /// (`is_ahead_of_sharders` backpressure, spec.md §4.5/§5).
    sync_bound: u64,
    /// Finalization-depth confirmation window `K`: MPT versions at rounds
    /// below `finalized_round - K` are pruned (spec.md §4.5).
    finalization_depth: u64,
}

impl ChainMachine {
    pub fn new(sync_bound: u64, finalization_depth: u64) -> Self {
        Self {
            current_round: 0,
            lfb: None,
            rounds: BTreeMap::new(),
            pending_settlement: BTreeMap::new(),
            sync_bound,
            finalization_depth,
        }
    }

    pub fn current_round(&self) -> u64 {
        self.current_round
    }

    pub fn lfb(&self) -> Option<&LatestFinalizedBlock> {
        self.lfb.as_ref()
    }

    /// Looks up or lazily creates the round entry for `number`, rejecting
    /// a round more than one ahead of `current_round`.
    pub fn round_mut(&mut self, number: u64) -> Result<&mut Round, ConsensusError> {
        if number > self.current_round + 1 {
            return Err(ConsensusError::RoundAheadOfChain {
                round: number,
                current: self.current_round,
            });
        }
        Ok(self.rounds.entry(number).or_insert_with(|| Round::new(number)))
    }

    pub fn round(&self, number: u64) -> Option<&Round> {
        self.rounds.get(&number)
    }

    /// Registers `b`'s settlement data (produced by executing its
    /// transactions) so `finalize` can apply it once `b` is chosen as the
    /// round's canonical block.
    pub fn register_settlement(&mut self, block_hash: [u8; 32], settlement: BlockSettlement) {
        self.pending_settlement.insert(block_hash, settlement);
    }

    /// Inserts `b` into round `r`'s block set. If another block already
    /// occupies that round, returns the canonical one: whichever is
    /// notarized, or if both or neither are, the lexicographically
    /// smaller hash (spec.md §4.5 `add_round_block`, fork resolution).
    pub fn add_round_block(&mut self, r: u64, b: Block, threshold: usize) -> Result<Block, ConsensusError> {
        let round = self.round_mut(r)?;
        let incoming_hash = b.hash;
        let already_present = round.block(&incoming_hash).cloned();
        if let Some(existing) = already_present {
            return Ok(existing);
        }

        let incoming_notarized = b.is_notarized(threshold);
        round.blocks_mut().insert(incoming_hash, b.clone());
        if incoming_notarized {
            round.state = RoundState::Notarized;
        }

        let canonical = self.canonical_block(r, threshold).unwrap_or(b);
        Ok(canonical)
    }

    /// Among every block cached for round `r`, the notarized one with the
    /// lexicographically smallest hash, or `None` if no block there is
    /// notarized yet.
    fn canonical_block(&self, r: u64, threshold: usize) -> Option<Block> {
        self.rounds
            .get(&r)?
            .blocks()
            .filter(|b| b.is_notarized(threshold))
            .min_by_key(|b| b.hash)
            .cloned()
    }

    /// If `b` is notarized, marks its round `Notarized` so proposal work
    /// for competing blocks at `r` is superseded and the next round may
    /// start (spec.md §4.5 `check_block_notarization`).
    pub fn check_block_notarization(&mut self, r: u64, b: &Block, threshold: usize) -> Result<bool, ConsensusError> {
        let round = self.round_mut(r)?;
        if b.is_notarized(threshold) {
            round.state = RoundState::Notarized;
            if r == self.current_round {
                self.current_round = r + 1;
                tracing::info!(round = r, "round notarized, starting next round");
            }
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Accepts a block carrying a different RRS than the round's own,
    /// but only if it is independently notarized: how a lagging node
    /// catches up to the committee's actual round outcome (spec.md §4.5
    /// `add_notarized_block_to_round`).
    pub fn add_notarized_block_to_round(
        &mut self,
        r: u64,
        b: Block,
        threshold: usize,
    ) -> Result<(), ConsensusError> {
        if !b.is_notarized(threshold) {
            return Err(ConsensusError::UnknownBlock(b.hash));
        }
        let round = self.round_mut(r)?;
        round.random_seed_override(b.round_random_seed);
        round.blocks_mut().insert(b.hash, b);
        round.state = RoundState::Notarized;
        Ok(())
    }

    /// Backpressure: true once the chain has drifted more than
    /// `sync_bound` rounds ahead of the sharders' reported LFB round,
    /// at which point new-round starts should be suspended (spec.md §4.5,
    /// §5.5).
    pub fn is_ahead_of_sharders(&self, next_round: u64, sharder_lfb_round: u64) -> bool {
        next_round.saturating_sub(sharder_lfb_round) > self.sync_bound
    }

    /// Applies `b`'s registered settlement to `ledger`, advances the LFB,
    /// and prunes trie versions below `r - finalization_depth`. Returns
    /// the finalization events so the caller can publish them to the
    /// telemetry bus.
    pub fn finalize(
        &mut self,
        r: u64,
        b: &Block,
        ledger: &mut dyn StateAccess,
        trie_store: &dyn TrieNodeStore,
    ) -> Result<Vec<Event>, ConsensusError> {
        let settlement = self.pending_settlement.remove(&b.hash).unwrap_or_default();

        for transfer in &settlement.transfers {
            apply_transfer(ledger, transfer).map_err(|e| ConsensusError::Crypto(e.to_string()))?;
        }
        for mint in &settlement.mints {
            apply_mint(ledger, mint).map_err(|e| ConsensusError::Crypto(e.to_string()))?;
        }

        self.lfb = Some(LatestFinalizedBlock { round: r, hash: b.hash });
        if let Some(round) = self.rounds.get_mut(&r) {
            round.state = RoundState::Notarized;
        }
        tracing::info!(round = r, hash = ?b.hash, "block finalized");

        if let Some(cutoff) = r.checked_sub(self.finalization_depth) {
            let pruned = trie_store.prune_below_version(cutoff);
            self.rounds.retain(|&round_number, _| round_number > cutoff);
            tracing::debug!(cutoff, pruned, "pruned trie versions below finalization window");
        }

        Ok(settlement.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_state::trie_backend::TrieStateAccess;
    use meridian_trie::store::InMemoryTrieNodeStore;
    use meridian_types::app::{AccountId, VerificationTicket};
    use std::collections::BTreeMap as Map;

    fn sample_block(round: u64, hash: [u8; 32]) -> Block {
        Block {
            round,
            prev_hash: [0u8; 32],
            hash,
            miner_id: AccountId::from_public_key(b"miner-0"),
            round_random_seed: 7,
            transactions: Vec::new(),
            verification_tickets: Map::new(),
            signature: Vec::new(),
            state_root: [0u8; 32],
        }
    }

    #[test]
    fn second_block_for_same_round_does_not_replace_the_first() {
        let mut chain = ChainMachine::new(10, 3);
        let first = sample_block(1, [1u8; 32]);
        let second = sample_block(1, [2u8; 32]);
        let canonical_first = chain.add_round_block(1, first.clone(), 10).expect("insert ok");
        assert_eq!(canonical_first.hash, first.hash);
        let canonical_second = chain.add_round_block(1, second, 10).expect("insert ok");
        assert_eq!(canonical_second.hash, first.hash);
    }

    #[test]
    fn check_block_notarization_advances_current_round() {
        let mut chain = ChainMachine::new(10, 3);
        chain.round_mut(1).expect("round created");
        let mut block = sample_block(1, [3u8; 32]);
        let signer = AccountId::from_public_key(b"signer-a");
        block.verification_tickets.insert(
            signer,
            VerificationTicket {
                block_hash: block.hash,
                signer,
                signature: Vec::new(),
            },
        );
        let notarized = chain.check_block_notarization(1, &block, 1).expect("checked");
        assert!(notarized);
        assert_eq!(chain.current_round(), 2);
    }

    #[test]
    fn is_ahead_of_sharders_respects_sync_bound() {
        let chain = ChainMachine::new(5, 3);
        assert!(!chain.is_ahead_of_sharders(10, 6));
        assert!(chain.is_ahead_of_sharders(12, 6));
    }

    #[test]
    fn finalize_applies_transfers_and_updates_lfb() {
        let mut chain = ChainMachine::new(10, 3);
        let store = InMemoryTrieNodeStore::new();
        let mut ledger = TrieStateAccess::new(&store, None);

        let alice = AccountId::from_public_key(b"alice");
        let bob = AccountId::from_public_key(b"bob");
        ledger
            .insert(
                &meridian_types::keys::balance_key(&alice),
                &parity_scale_codec::Encode::encode(&100u128),
            )
            .expect("seed balance");

        let block = sample_block(1, [9u8; 32]);
        chain.register_settlement(
            block.hash,
            BlockSettlement {
                transfers: vec![Transfer { from: alice, to: bob, amount: 30 }],
                mints: Vec::new(),
                events: vec![Event {
                    block_round: 1,
                    sequence: 0,
                    event_type: "block".into(),
                    tag: "finalized".into(),
                    entity_id: "9".into(),
                    payload: Vec::new(),
                }],
            },
        );

        let events = chain
            .finalize(1, &block, &mut ledger, &store)
            .expect("finalize succeeds");
        assert_eq!(events.len(), 1);
        assert_eq!(chain.lfb().expect("lfb set").hash, block.hash);
    }
}
