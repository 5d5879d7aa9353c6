//! Concrete chain state: a trie-backed `StateAccess`, the sandboxed
//! per-transaction `StateContext`, and the partitioned sets used to pick
//! blobbers and validators (spec.md §4.2, §4.7.2).
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

pub mod context;
pub mod partition;
pub mod trie_backend;

pub mod prelude {
    pub use crate::context::TxStateContext;
    pub use crate::partition::{ItemRef, PartitionedSet, DEFAULT_PARTITION_CAPACITY};
    pub use crate::trie_backend::TrieStateAccess;
}
