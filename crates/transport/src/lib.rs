//! The peer-pool transport adapter (spec.md §4.8): a pluggable
//! `PeerTransport` plus the `request_entity`/`broadcast_entity`
//! structured-concurrency primitives built on top of it.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

pub mod error;
pub mod pool;

pub mod prelude {
    pub use crate::error::TransportError;
    pub use crate::pool::{broadcast_entity, request_entity, PeerId, PeerTransport};
}
