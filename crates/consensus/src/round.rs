//! Per-round state machine: VRF share collection, round random seed (RRS)
//! derivation, block proposal intake, and verification-ticket merging
//! (spec.md §4.4).

use std::collections::BTreeMap;

use meridian_api::hooks::RoundHooks;
use meridian_crypto::ecdsa;
use meridian_crypto::hash::sha3_256;
use meridian_crypto::sign::bls::{BlsPublicKey, BlsSignature};
use meridian_types::app::{Block, MagicBlock, PartyId, VerificationTicket, VrfShare};

use crate::error::ConsensusError;
use crate::key_resolver::PartyKeyResolver;

/// The round's position in spec.md §4.4's state diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    Open,
    VrfReady,
    ProposalsCollected,
    Notarized,
}

/// Builds the message a VRF share signs: the round number and its current
/// timeout count, so a resigned share under a bumped timeout count is
/// cryptographically distinct from the one it replaces.
pub fn vrf_message(round: u64, timeout_count: u32) -> Vec<u8> {
    let mut message = round.to_be_bytes().to_vec();
    message.extend_from_slice(&timeout_count.to_be_bytes());
    message
}

/// Derives the round random seed from the combined VRF shares: the
/// aggregated signature's hash, first 8 bytes, as a signed integer
/// (spec.md §4.4).
fn derive_random_seed(shares: &[VrfShare]) -> Result<i64, ConsensusError> {
    let signatures = shares
        .iter()
        .map(|s| {
            BlsSignature::from_bytes(&s.share)
                .map_err(|e| ConsensusError::Crypto(e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let aggregate = BlsSignature::aggregate(&signatures);
    let digest = sha3_256(&aggregate.to_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    Ok(i64::from_be_bytes(bytes))
}

/// One round's accumulated state: VRF shares by party, the derived RRS
/// once threshold is reached, and every block proposed for the round,
/// keyed by hash (spec.md's `Round` entity, §4).
pub struct Round {
    pub number: u64,
    pub state: RoundState,
    pub timeout_count: u32,
    vrf_shares: BTreeMap<PartyId, VrfShare>,
    random_seed: Option<i64>,
    blocks: BTreeMap<[u8; 32], Block>,
}

impl Round {
    pub fn new(number: u64) -> Self {
        Self {
            number,
            state: RoundState::Open,
            timeout_count: 0,
            vrf_shares: BTreeMap::new(),
            random_seed: None,
            blocks: BTreeMap::new(),
        }
    }

    pub fn random_seed(&self) -> Option<i64> {
        self.random_seed
    }

    pub fn vrf_share_count(&self) -> usize {
        self.vrf_shares.len()
    }

    pub fn block(&self, hash: &[u8; 32]) -> Option<&Block> {
        self.blocks.get(hash)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    /// Mutable access to the round's block cache, for the chain machine's
    /// `add_round_block`/`add_notarized_block_to_round` to insert into
    /// directly rather than re-deriving notarization state itself.
    pub fn blocks_mut(&mut self) -> &mut BTreeMap<[u8; 32], Block> {
        &mut self.blocks
    }

    /// Replaces the round's RRS with one recovered from an independently
    /// notarized block (spec.md §4.5 `add_notarized_block_to_round`).
    pub fn random_seed_override(&mut self, seed: i64) {
        self.random_seed = Some(seed);
    }

    /// The first block (by insertion into the `BTreeMap`, i.e. lexicographic
    /// hash order) that has reached `threshold` distinct tickets.
    pub fn notarized_block(&self, threshold: usize) -> Option<&Block> {
        self.blocks.values().find(|b| b.is_notarized(threshold))
    }

    /// Bumps the timeout count and discards VRF progress so a fresh round
    /// of VRF signing (over the new timeout-tagged message) can begin
    /// (spec.md §4.4 timeout behaviour).
    pub fn bump_timeout(&mut self) {
        self.timeout_count += 1;
        self.vrf_shares.clear();
        self.random_seed = None;
        self.state = RoundState::Open;
        tracing::warn!(round = self.number, timeout_count = self.timeout_count, "round timed out, resigning VRF");
    }
}

/// Drives one round's state transitions. Holds no chain-wide state; the
/// chain machine owns a `BTreeMap<u64, Round>` and looks up the active
/// `MagicBlock` per round itself.
pub struct RoundMachine<'a> {
    magic_block: &'a MagicBlock,
    key_resolver: &'a dyn PartyKeyResolver,
    hooks: &'a dyn RoundHooks,
}

impl<'a> RoundMachine<'a> {
    pub fn new(
        magic_block: &'a MagicBlock,
        key_resolver: &'a dyn PartyKeyResolver,
        hooks: &'a dyn RoundHooks,
    ) -> Self {
        Self {
            magic_block,
            key_resolver,
            hooks,
        }
    }

    /// Accepts a VRF share for `round`, verifying it against the
    /// committee's group key, and transitions `Open -> VrfReady` once
    /// `threshold` distinct shares have been collected.
    ///
    /// `round` must not be more than one ahead of `chain_current_round`;
    /// the chain machine enforces this before creating a `Round` lazily.
    pub fn add_vrf_share(
        &self,
        round: &mut Round,
        share: VrfShare,
        chain_current_round: u64,
    ) -> Result<RoundState, ConsensusError> {
        if round.number > chain_current_round + 1 {
            return Err(ConsensusError::RoundAheadOfChain {
                round: round.number,
                current: chain_current_round,
            });
        }

        let group_key = BlsPublicKey::from_bytes(&self.magic_block.group_public_key)
            .map_err(|e| ConsensusError::Crypto(e.to_string()))?;
        let signature = BlsSignature::from_bytes(&share.share)
            .map_err(|e| ConsensusError::Crypto(e.to_string()))?;
        let message = vrf_message(share.round, share.round_timeout_count);
        group_key
            .verify(&message, &signature)
            .map_err(|_| ConsensusError::InvalidVrfShare(share.party))?;

        round.vrf_shares.insert(share.party, share);

        if round.state == RoundState::Open
            && round.vrf_shares.len() >= self.magic_block.threshold as usize
        {
            let shares: Vec<VrfShare> = round.vrf_shares.values().cloned().collect();
            round.random_seed = Some(derive_random_seed(&shares)?);
            round.state = RoundState::VrfReady;
        }

        Ok(round.state)
    }

    /// Accepts a proposed block for a VRF-ready round, verifying the
    /// generator's signature. If merged tickets already meet threshold
    /// (e.g. a late-arriving proposal for an already-notarized hash), the
    /// round transitions straight to `Notarized`.
    pub fn add_block_proposal(
        &self,
        round: &mut Round,
        block: Block,
    ) -> Result<RoundState, ConsensusError> {
        if round.random_seed.is_none() {
            return Err(ConsensusError::VrfNotReady(round.number));
        }

        let public_key = self
            .key_resolver
            .public_key_of(&block.miner_id)
            .ok_or_else(|| {
                ConsensusError::UnknownParty(
                    self.magic_block.party_id_of(&block.miner_id).unwrap_or(u64::MAX),
                )
            })?;
        ecdsa::verify(&public_key, &block.hash, &block.signature)
            .map_err(|_| ConsensusError::InvalidBlockSignature)?;

        let notarized_now = block.is_notarized(self.magic_block.threshold as usize);
        round.blocks.insert(block.hash, block);

        if round.state != RoundState::Notarized {
            round.state = if notarized_now {
                RoundState::Notarized
            } else {
                RoundState::ProposalsCollected
            };
        }

        Ok(round.state)
    }

    /// Verifies and merges a verification ticket into its target block,
    /// deduplicating by signer, and notarizes the block once `threshold`
    /// distinct signers have been collected.
    pub fn add_verification_ticket(
        &self,
        round: &mut Round,
        ticket: VerificationTicket,
    ) -> Result<RoundState, ConsensusError> {
        let public_key = self
            .key_resolver
            .public_key_of(&ticket.signer)
            .ok_or_else(|| {
                ConsensusError::UnknownParty(
                    self.magic_block.party_id_of(&ticket.signer).unwrap_or(u64::MAX),
                )
            })?;
        ecdsa::verify(&public_key, &ticket.block_hash, &ticket.signature)
            .map_err(|_| ConsensusError::InvalidTicketSignature)?;

        let block = round
            .blocks
            .get_mut(&ticket.block_hash)
            .ok_or(ConsensusError::UnknownBlock(ticket.block_hash))?;

        if block.verification_tickets.contains_key(&ticket.signer) {
            let party = self
                .magic_block
                .party_id_of(&ticket.signer)
                .unwrap_or(u64::MAX);
            return Err(ConsensusError::DuplicateTicketSigner(party));
        }
        block.verification_tickets.insert(ticket.signer, ticket);

        if block.is_notarized(self.magic_block.threshold as usize) {
            round.state = RoundState::Notarized;
        }

        Ok(round.state)
    }

    pub fn hooks(&self) -> &dyn RoundHooks {
        self.hooks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_crypto::ecdsa::EcdsaKeyPair;
    use meridian_crypto::sign::bls::BlsKeyPair;
    use meridian_types::app::AccountId;

    use crate::key_resolver::StaticKeyResolver;

    struct NoHooks;
    impl RoundHooks for NoHooks {}

    #[test]
    fn vrf_share_from_unknown_party_fails_verification() {
        // Single-party committee where the group key is that party's own
        // key, so one genuine share reaches threshold.
        let keypair = BlsKeyPair::generate().expect("keygen");
        let miners = vec![AccountId::from_public_key(b"miner-0")];
        let magic_block = MagicBlock {
            number: 1,
            starting_round: 0,
            miners,
            sharders: Vec::new(),
            threshold: 1,
            group_public_key: keypair.public_key().to_bytes(),
        };
        let resolver = StaticKeyResolver::new();
        let hooks = NoHooks;
        let machine = RoundMachine::new(&magic_block, &resolver, &hooks);

        let mut round = Round::new(1);
        let bogus = BlsKeyPair::generate().expect("keygen");
        let message = vrf_message(1, 0);
        let bad_signature = bogus.sign(&message).expect("sign");
        let share = VrfShare {
            round: 1,
            party: 0,
            round_timeout_count: 0,
            share: bad_signature.to_bytes(),
        };
        let result = machine.add_vrf_share(&mut round, share, 0);
        assert!(matches!(result, Err(ConsensusError::InvalidVrfShare(0))));
    }

    #[test]
    fn vrf_threshold_reached_transitions_to_vrf_ready() {
        let keypair = BlsKeyPair::generate().expect("keygen");
        let miners = vec![AccountId::from_public_key(b"miner-0")];
        let magic_block = MagicBlock {
            number: 1,
            starting_round: 0,
            miners,
            sharders: Vec::new(),
            threshold: 1,
            group_public_key: keypair.public_key().to_bytes(),
        };
        let resolver = StaticKeyResolver::new();
        let hooks = NoHooks;
        let machine = RoundMachine::new(&magic_block, &resolver, &hooks);

        let mut round = Round::new(1);
        let message = vrf_message(1, 0);
        let signature = keypair.sign(&message).expect("sign");
        let share = VrfShare {
            round: 1,
            party: 0,
            round_timeout_count: 0,
            share: signature.to_bytes(),
        };
        let state = machine.add_vrf_share(&mut round, share, 0).expect("accepted");
        assert_eq!(state, RoundState::VrfReady);
        assert!(round.random_seed().is_some());
    }

    #[test]
    fn vrf_share_ahead_of_chain_is_rejected() {
        let keypair = BlsKeyPair::generate().expect("keygen");
        let miners = vec![AccountId::from_public_key(b"miner-0")];
        let magic_block = MagicBlock {
            number: 1,
            starting_round: 0,
            miners,
            sharders: Vec::new(),
            threshold: 1,
            group_public_key: keypair.public_key().to_bytes(),
        };
        let resolver = StaticKeyResolver::new();
        let hooks = NoHooks;
        let machine = RoundMachine::new(&magic_block, &resolver, &hooks);

        let mut round = Round::new(5);
        let message = vrf_message(5, 0);
        let signature = keypair.sign(&message).expect("sign");
        let share = VrfShare {
            round: 5,
            party: 0,
            round_timeout_count: 0,
            share: signature.to_bytes(),
        };
        let result = machine.add_vrf_share(&mut round, share, 1);
        assert!(matches!(result, Err(ConsensusError::RoundAheadOfChain { .. })));
    }

    #[test]
    fn block_proposal_before_vrf_ready_is_rejected() {
        let keypair = BlsKeyPair::generate().expect("keygen");
        let miners = vec![AccountId::from_public_key(b"miner-0")];
        let magic_block = MagicBlock {
            number: 1,
            starting_round: 0,
            miners,
            sharders: Vec::new(),
            threshold: 1,
            group_public_key: keypair.public_key().to_bytes(),
        };
        let resolver = StaticKeyResolver::new();
        let hooks = NoHooks;
        let machine = RoundMachine::new(&magic_block, &resolver, &hooks);
        let mut round = Round::new(1);

        let miner_key = EcdsaKeyPair::generate();
        let block = sample_block(&miner_key, &magic_block.miners[0]);
        let result = machine.add_block_proposal(&mut round, block);
        assert!(matches!(result, Err(ConsensusError::VrfNotReady(1))));
    }

    #[test]
    fn duplicate_ticket_from_same_signer_is_rejected() {
        let keypair = BlsKeyPair::generate().expect("keygen");
        let miner_id = AccountId::from_public_key(b"miner-0");
        let magic_block = MagicBlock {
            number: 1,
            starting_round: 0,
            miners: vec![miner_id],
            sharders: Vec::new(),
            threshold: 2,
            group_public_key: keypair.public_key().to_bytes(),
        };

        let miner_key = EcdsaKeyPair::generate();
        let signer_key = EcdsaKeyPair::generate();
        let signer_id = AccountId::from_public_key(&signer_key.public_key_bytes());
        let resolver = StaticKeyResolver::new()
            .with_key(miner_id, miner_key.public_key_bytes())
            .with_key(signer_id, signer_key.public_key_bytes());
        let hooks = NoHooks;
        let machine = RoundMachine::new(&magic_block, &resolver, &hooks);

        let mut round = Round::new(1);
        round.random_seed = Some(42);
        let block = sample_block(&miner_key, &miner_id);
        let block_hash = block.hash;
        round.blocks.insert(block_hash, block);

        let signature = signer_key.sign(&block_hash);
        let ticket = VerificationTicket {
            block_hash,
            signer: signer_id,
            signature,
        };
        machine
            .add_verification_ticket(&mut round, ticket.clone())
            .expect("first ticket accepted");
        let result = machine.add_verification_ticket(&mut round, ticket);
        assert!(matches!(result, Err(ConsensusError::DuplicateTicketSigner(_))));
    }

    fn sample_block(miner_key: &EcdsaKeyPair, miner_id: &AccountId) -> Block {
        let hash = [7u8; 32];
        let signature = miner_key.sign(&hash);
        Block {
            round: 1,
            prev_hash: [0u8; 32],
            hash,
            miner_id: *miner_id,
            round_random_seed: 42,
            transactions: Vec::new(),
            verification_tickets: BTreeMap::new(),
            signature,
            state_root: [0u8; 32],
        }
    }
}
