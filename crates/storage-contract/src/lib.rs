//! The storage-service contract (spec.md §4.7): allocation lifecycle,
//! the challenge protocol, and expiry sweeping, dispatched through
//! `meridian-api`'s `BlockchainService` seam.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

pub mod allocation;
pub mod challenge;
pub mod error;
pub mod service;
pub mod types;

pub mod prelude {
    pub use crate::allocation::{
        close_allocation, finalize_allocation, get_allocation, get_blobber_allocation,
        new_allocation_request, update_allocation_request, NewAllocationRequest,
    };
    pub use crate::challenge::{
        challenge_seed, generate_challenge, get_challenge, settle_challenge, sweep_expired,
        verify_response, ChallengeOutcome, ValidatorKeyResolver,
    };
    pub use crate::error::StorageError;
    pub use crate::service::{InMemoryValidatorKeys, StorageContractService, SERVICE_ID};
    pub use crate::types::{
        Allocation, AllocationStatus, BlobberAllocation, BlobberPartitionEntry, ChallengePool,
        ChallengeStatus, ReadPool, StorageChallenge, ValidationTicket, WritePool,
    };
}
