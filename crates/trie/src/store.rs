//! Backing storage for trie nodes, with per-version delta accumulation so
//! old state versions can be pruned once no longer needed (spec.md §4.1).

use std::collections::HashMap;
use std::sync::RwLock;

use crate::node::{Node, NodeHash};

/// The set of nodes created and nodes superseded by a single version's
/// mutation. Handed to a `TrieNodeStore` at commit time; the store records
/// `new_nodes` immediately and notes `stale_nodes` as pruning candidates.
#[derive(Debug, Clone, Default)]
pub struct DeltaAccumulator {
    pub new_nodes: Vec<(NodeHash, Node)>,
    /// Hashes of nodes this version's mutation stopped referencing. A node
    /// reintroduced later (same content, same hash) is simply re-recorded
    /// as new and its earlier staleness marker is overwritten on commit.
    pub stale_nodes: Vec<NodeHash>,
}

impl DeltaAccumulator {
    pub fn record_new(&mut self, hash: NodeHash, node: Node) {
        self.new_nodes.push((hash, node));
    }

    pub fn record_stale(&mut self, hash: NodeHash) {
        self.stale_nodes.push(hash);
    }
}

/// Durable (here, in-memory) storage for content-addressed trie nodes,
/// independent of the block archive in `meridian-blockstore`.
pub trait TrieNodeStore: Send + Sync {
    fn get_node(&self, hash: &NodeHash) -> Option<Node>;

    /// Commits one version's delta: persists every new node and records
    /// each stale node's pruning eligibility as of `version`.
    fn commit_delta(&self, version: u64, delta: DeltaAccumulator);

    /// Deletes every node whose staleness version is strictly below
    /// `cutoff` and that has not been re-recorded as new since. Returns
    /// the number of nodes removed.
    fn prune_below_version(&self, cutoff: u64) -> usize;
}

#[derive(Default)]
struct Inner {
    nodes: HashMap<NodeHash, Node>,
    /// The version at which a node was superseded, if it has been.
    stale_since: HashMap<NodeHash, u64>,
}

/// An in-memory `TrieNodeStore`. Production deployments back the trie with
/// `meridian-blockstore`'s content-addressed archive instead; this is the
/// implementation used by tests and single-process simulation.
#[derive(Default)]
pub struct InMemoryTrieNodeStore {
    inner: RwLock<Inner>,
}

impl InMemoryTrieNodeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrieNodeStore for InMemoryTrieNodeStore {
    fn get_node(&self, hash: &NodeHash) -> Option<Node> {
        self.inner.read().ok()?.nodes.get(hash).cloned()
    }

    fn commit_delta(&self, version: u64, delta: DeltaAccumulator) {
        let Ok(mut inner) = self.inner.write() else {
            return;
        };
        for (hash, node) in delta.new_nodes {
            inner.nodes.insert(hash, node);
            inner.stale_since.remove(&hash);
        }
        for hash in delta.stale_nodes {
            inner.stale_since.entry(hash).or_insert(version);
        }
    }

    fn prune_below_version(&self, cutoff: u64) -> usize {
        let Ok(mut inner) = self.inner.write() else {
            return 0;
        };
        let to_remove: Vec<NodeHash> = inner
            .stale_since
            .iter()
            .filter(|(_, version)| **version < cutoff)
            .map(|(hash, _)| *hash)
            .collect();
        for hash in &to_remove {
            inner.nodes.remove(hash);
            inner.stale_since.remove(hash);
        }
        to_remove.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nibble::NibblePath;

    #[test]
    fn stale_node_below_cutoff_is_pruned() {
        let store = InMemoryTrieNodeStore::new();
        let node = Node::leaf(NibblePath::from_key(b"k"), b"v".to_vec());
        let hash = node.hash();

        let mut delta = DeltaAccumulator::default();
        delta.record_new(hash, node);
        store.commit_delta(1, delta);

        let mut delta2 = DeltaAccumulator::default();
        delta2.record_stale(hash);
        store.commit_delta(2, delta2);

        assert_eq!(store.prune_below_version(2), 0);
        assert_eq!(store.prune_below_version(3), 1);
        assert!(store.get_node(&hash).is_none());
    }
}
