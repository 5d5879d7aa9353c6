//! Adapts `meridian-trie`'s `Trie` to the `StateAccess` seam so the round
//! machine's executor can read and write chain state without knowing it is
//! backed by a Merkle-Patricia trie (spec.md §4.2).

use meridian_api::state::{StateAccess, StateError, StateScanItem};
use meridian_trie::prelude::{NodeHash, TrieNodeStore};
use meridian_trie::tree::Trie;

/// One version's worth of trie mutations, exposed through `StateAccess`.
/// Construct one per block from the previous block's root, apply every
/// transaction's writes through it, then call `commit` to get the new root
/// and the delta to persist.
pub struct TrieStateAccess<'s> {
    trie: Trie<'s>,
}

impl<'s> TrieStateAccess<'s> {
    pub fn new(store: &'s dyn TrieNodeStore, root: Option<NodeHash>) -> Self {
        Self {
            trie: Trie::new(store, root),
        }
    }

    pub fn root_hash(&self) -> Option<NodeHash> {
        self.trie.root_hash()
    }

    pub fn commit(self) -> (Option<NodeHash>, meridian_trie::prelude::DeltaAccumulator) {
        self.trie.finish()
    }
}

impl StateAccess for TrieStateAccess<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        self.trie
            .get(key)
            .map_err(|e| StateError::Backend(e.to_string()))
    }

    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        self.trie
            .insert(key, value.to_vec())
            .map_err(|e| StateError::Backend(e.to_string()))
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        self.trie
            .delete(key)
            .map_err(|e| StateError::Backend(e.to_string()))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<StateScanItem>, StateError> {
        let items = self
            .trie
            .prefix_scan(prefix)
            .map_err(|e| StateError::Backend(e.to_string()))?;
        Ok(items.into_iter().map(Ok).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_trie::prelude::InMemoryTrieNodeStore;

    #[test]
    fn writes_are_visible_through_state_access() {
        let store = InMemoryTrieNodeStore::new();
        let mut access = TrieStateAccess::new(&store, None);
        access.insert(b"k", b"v").expect("insert");
        assert_eq!(access.get(b"k").expect("get"), Some(b"v".to_vec()));
    }

    #[test]
    fn commit_then_reopen_preserves_state() {
        let store = InMemoryTrieNodeStore::new();
        let root = {
            let mut access = TrieStateAccess::new(&store, None);
            access.insert(b"k", b"v").expect("insert");
            let (root, delta) = access.commit();
            store.commit_delta(1, delta);
            root
        };
        let access = TrieStateAccess::new(&store, root);
        assert_eq!(access.get(b"k").expect("get"), Some(b"v".to_vec()));
    }
}
