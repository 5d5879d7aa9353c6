//! Errors raised by the storage-service contract (spec.md §4.7).

use meridian_types::error::{CoreError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("allocation {0} not found")]
    UnknownAllocation(String),
    #[error("allocation {0} is not in a state that permits this operation")]
    WrongAllocationStatus(String),
    #[error("allocation {0} is already expired")]
    AllocationAlreadyExpired(String),
    #[error("not enough blobbers registered to satisfy {needed} data+parity shards")]
    InsufficientBlobbers { needed: u32 },
    #[error("write pool balance {balance} is below the min lock demand {required}")]
    InsufficientWritePool { balance: u128, required: u128 },
    #[error("challenge {0} not found")]
    UnknownChallenge(String),
    #[error("challenge {0} is not open")]
    ChallengeNotOpen(String),
    #[error("blobber {0} is not part of this allocation")]
    UnknownBlobberAllocation(String),
    #[error("fewer than the required number of validation tickets were provided")]
    InsufficientValidationTickets,
    #[error("caller {0} is not authorized to perform this operation")]
    Unauthorized(String),
    #[error("unsupported method {0}")]
    UnsupportedMethod(String),
    #[error("state access failed: {0}")]
    State(String),
}

impl ErrorCode for StorageError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownAllocation(_) => "STORAGE_UNKNOWN_ALLOCATION",
            Self::WrongAllocationStatus(_) => "STORAGE_WRONG_ALLOCATION_STATUS",
            Self::AllocationAlreadyExpired(_) => "STORAGE_ALLOCATION_ALREADY_EXPIRED",
            Self::InsufficientBlobbers { .. } => "STORAGE_INSUFFICIENT_BLOBBERS",
            Self::InsufficientWritePool { .. } => "STORAGE_INSUFFICIENT_WRITE_POOL",
            Self::UnknownChallenge(_) => "STORAGE_UNKNOWN_CHALLENGE",
            Self::ChallengeNotOpen(_) => "STORAGE_CHALLENGE_NOT_OPEN",
            Self::UnknownBlobberAllocation(_) => "STORAGE_UNKNOWN_BLOBBER_ALLOCATION",
            Self::InsufficientValidationTickets => "STORAGE_INSUFFICIENT_VALIDATION_TICKETS",
            Self::Unauthorized(_) => "STORAGE_UNAUTHORIZED",
            Self::UnsupportedMethod(_) => "STORAGE_UNSUPPORTED_METHOD",
            Self::State(_) => "STORAGE_STATE_ERROR",
        }
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        CoreError::Custom(err.to_string())
    }
}
