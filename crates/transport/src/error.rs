//! Errors raised by the peer-pool fan-out and broadcast primitives
//! (spec.md §4.8).

use meridian_types::error::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// No peer in the fan-out returned a validated entity before the
    /// deadline.
    #[error("no peer returned a validated entity within the timeout")]
    NotFound,
    /// A peer's handler returned an entity that failed validation.
    #[error("peer {0} returned an entity that failed validation: {1}")]
    InvalidEntity(String, String),
    /// A peer's handler failed outright (connection refused, decode
    /// failure, ...).
    #[error("peer {0} request failed: {1}")]
    PeerError(String, String),
    /// `request_entity` was called with an empty peer set.
    #[error("no peers available to fan out to")]
    NoPeers,
}

impl ErrorCode for TransportError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "TRANSPORT_NOT_FOUND",
            Self::InvalidEntity(..) => "TRANSPORT_INVALID_ENTITY",
            Self::PeerError(..) => "TRANSPORT_PEER_ERROR",
            Self::NoPeers => "TRANSPORT_NO_PEERS",
        }
    }
}
