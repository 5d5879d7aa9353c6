//! Versioned radix-16 Merkle-Patricia trie backing chain state
//! (spec.md §4.1). Nodes are content-addressed by SHA3-256, so identical
//! subtrees across versions share storage, and pruning a version only
//! removes the nodes no later version still references.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

pub mod nibble;
pub mod node;
pub mod store;
pub mod tree;

pub mod prelude {
    pub use crate::nibble::NibblePath;
    pub use crate::node::{BranchNode, ExtensionNode, LeafNode, Node, NodeHash};
    pub use crate::store::{DeltaAccumulator, InMemoryTrieNodeStore, TrieNodeStore};
    pub use crate::tree::{Trie, TrieError};
}
