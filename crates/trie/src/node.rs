//! Trie node shapes: leaf, extension, and 16-way branch, content-addressed
//! by the SHA3-256 hash of their canonical encoding (spec.md §4.1).

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use meridian_crypto::hash::sha3_256;

use crate::nibble::NibblePath;

pub type NodeHash = [u8; 32];

/// A node in the trie. `Leaf` terminates a path with a value; `Extension`
/// collapses a run of single-child branches; `Branch` holds up to 16
/// children plus an optional value for keys that terminate exactly at the
/// branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum Node {
    Leaf(LeafNode),
    Extension(ExtensionNode),
    Branch(BranchNode),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct LeafNode {
    /// Remaining nibbles of the key below this node, stored as raw bytes
    /// (one nibble per entry) to keep the node's own encoding simple.
    pub path: Vec<u8>,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct ExtensionNode {
    pub path: Vec<u8>,
    pub child: NodeHash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct BranchNode {
    /// Slot `i` holds the hash of the child reached by nibble `i`, if any.
    pub children: [Option<NodeHash>; 16],
    /// Value stored for a key whose path ends exactly at this branch.
    pub value: Option<Vec<u8>>,
}

impl Default for BranchNode {
    fn default() -> Self {
        Self {
            children: Default::default(),
            value: None,
        }
    }
}

impl Node {
    pub fn leaf(path: NibblePath, value: Vec<u8>) -> Self {
        Node::Leaf(LeafNode {
            path: path.nibbles().to_vec(),
            value,
        })
    }

    pub fn extension(path: NibblePath, child: NodeHash) -> Self {
        Node::Extension(ExtensionNode {
            path: path.nibbles().to_vec(),
            child,
        })
    }

    /// The content-addressed hash of this node's canonical encoding. Two
    /// nodes with identical contents always hash identically, which is
    /// what lets the trie deduplicate shared subtrees across versions.
    pub fn hash(&self) -> NodeHash {
        sha3_256(&self.encode())
    }
}
