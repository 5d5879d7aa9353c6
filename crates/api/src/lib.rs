//! # Meridian API
//!
//! The stable trait contracts every other Meridian crate programs against:
//! state access, the smart-contract dispatch seam, the block archive
//! interface, block-lifecycle hooks, and the round-machine test-injection
//! seam.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

/// Re-exports of the cross-cutting error primitives.
pub mod error;
/// The round-machine behavior-injection seam (`RoundHooks`).
pub mod hooks;
/// Block-lifecycle hooks a contract can opt into.
pub mod lifecycle;
/// The smart-contract dispatch trait and service directory.
pub mod services;
/// `StateAccess` and `StateContext`: the read/write seams of block
/// execution.
pub mod state;
/// The durable, content-addressed block archive interface.
pub mod storage;
/// The read-only execution context passed to dispatched calls.
pub mod transaction;

/// A curated set of the most commonly used traits and types.
pub mod prelude {
    pub use crate::error::{CoreError, ErrorCode};
    pub use crate::hooks::{NoopRoundHooks, RoundHooks};
    pub use crate::lifecycle::OnEndBlock;
    pub use crate::services::access::ServiceDirectory;
    pub use crate::services::BlockchainService;
    pub use crate::state::{StateAccess, StateContext, StateError};
    pub use crate::storage::NodeStore;
    pub use crate::transaction::context::TxContext;
}
