//! Errors raised by the round and chain machines (spec.md §4.4, §4.5).

use meridian_types::app::PartyId;
use meridian_types::error::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("round {round} is more than one ahead of the chain's current round {current}")]
    RoundAheadOfChain { round: u64, current: u64 },
    #[error("no public key registered for party {0}")]
    UnknownParty(PartyId),
    #[error("VRF share from party {0} failed verification")]
    InvalidVrfShare(PartyId),
    #[error("block proposal for round {0} arrived before VRF completion")]
    VrfNotReady(u64),
    #[error("block signature failed verification")]
    InvalidBlockSignature,
    #[error("verification ticket signature failed verification")]
    InvalidTicketSignature,
    #[error("party {0} already submitted a verification ticket for this block")]
    DuplicateTicketSigner(PartyId),
    #[error("block {0:?} not found in round cache")]
    UnknownBlock([u8; 32]),
    #[error("cryptographic operation failed: {0}")]
    Crypto(String),
}

impl ErrorCode for ConsensusError {
    fn code(&self) -> &'static str {
        match self {
            Self::RoundAheadOfChain { .. } => "CONSENSUS_ROUND_AHEAD_OF_CHAIN",
            Self::UnknownParty(_) => "CONSENSUS_UNKNOWN_PARTY",
            Self::InvalidVrfShare(_) => "CONSENSUS_INVALID_VRF_SHARE",
            Self::VrfNotReady(_) => "CONSENSUS_VRF_NOT_READY",
            Self::InvalidBlockSignature => "CONSENSUS_INVALID_BLOCK_SIGNATURE",
            Self::InvalidTicketSignature => "CONSENSUS_INVALID_TICKET_SIGNATURE",
            Self::DuplicateTicketSigner(_) => "CONSENSUS_DUPLICATE_TICKET_SIGNER",
            Self::UnknownBlock(_) => "CONSENSUS_UNKNOWN_BLOCK",
            Self::Crypto(_) => "CONSENSUS_CRYPTO_FAILURE",
        }
    }
}
