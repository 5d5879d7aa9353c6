//! Shared fixtures for integration tests across the Meridian kernel:
//! deterministic keypairs, an in-memory trie-backed state context, and a
//! scripted peer transport, so crate-level test suites don't each redefine
//! the same fakes.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

pub mod keys;
pub mod state;
pub mod transport;

pub mod prelude {
    pub use crate::keys::{bls_keypair, ecdsa_keypair};
    pub use crate::state::StateFixture;
    pub use crate::transport::{ScriptedResponse, ScriptedTransport};
}
