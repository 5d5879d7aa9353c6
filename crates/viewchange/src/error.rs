//! Errors raised while driving a DKG round (spec.md §4.6).

use meridian_types::app::PartyId;
use meridian_types::error::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewChangeError {
    #[error("contribution from party {0} arrived outside the contribute phase")]
    UnexpectedContribution(PartyId),
    #[error("share from party {0} arrived outside the share phase")]
    UnexpectedShare(PartyId),
    #[error("share from party {0} failed signature verification")]
    InvalidShareSignature(PartyId),
    #[error("share from party {0} is inconsistent with their published contribution")]
    InvalidShareValue(PartyId),
    #[error("no contribution on file for party {0}")]
    UnknownContributor(PartyId),
    #[error("fewer than the threshold number of contributors were qualified; view change failed")]
    QuorumNotReached,
    #[error("operation attempted in the wrong phase")]
    WrongPhase,
    #[error("cryptographic operation failed: {0}")]
    Crypto(String),
}

impl ErrorCode for ViewChangeError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnexpectedContribution(_) => "VIEWCHANGE_UNEXPECTED_CONTRIBUTION",
            Self::UnexpectedShare(_) => "VIEWCHANGE_UNEXPECTED_SHARE",
            Self::InvalidShareSignature(_) => "VIEWCHANGE_INVALID_SHARE_SIGNATURE",
            Self::InvalidShareValue(_) => "VIEWCHANGE_INVALID_SHARE_VALUE",
            Self::UnknownContributor(_) => "VIEWCHANGE_UNKNOWN_CONTRIBUTOR",
            Self::QuorumNotReached => "VIEWCHANGE_QUORUM_NOT_REACHED",
            Self::WrongPhase => "VIEWCHANGE_WRONG_PHASE",
            Self::Crypto(_) => "VIEWCHANGE_CRYPTO_FAILURE",
        }
    }
}
