//! An in-memory, trie-backed state context for tests that need a real
//! `StateAccess` implementation without standing up a node's block
//! archive or chain machine.

use meridian_api::state::StateAccess;
use meridian_trie::prelude::{InMemoryTrieNodeStore, NodeHash, TrieNodeStore};
use meridian_state::trie_backend::TrieStateAccess;

/// Owns the trie-node store a [`TrieStateAccess`] borrows from, so a test
/// can commit one version, read back the result, and build the next
/// version on top, all against a single fixture.
#[derive(Default)]
pub struct StateFixture {
    store: InMemoryTrieNodeStore,
    root: Option<NodeHash>,
}

impl StateFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently committed root, or `None` if nothing has been
    /// committed yet.
    pub fn root(&self) -> Option<NodeHash> {
        self.root
    }

    /// Runs `mutate` against a fresh [`TrieStateAccess`] rooted at the
    /// fixture's current root, commits the resulting delta, and advances
    /// the fixture's root to the new value.
    pub fn apply<F>(&mut self, version: u64, mutate: F)
    where
        F: FnOnce(&mut dyn StateAccess),
    {
        let mut access = TrieStateAccess::new(&self.store, self.root);
        mutate(&mut access);
        let (root, delta) = access.commit();
        self.store.commit_delta(version, delta);
        self.root = root;
    }

    /// A read-only [`TrieStateAccess`] rooted at the fixture's current
    /// root, for assertions that don't need to mutate state.
    pub fn access(&self) -> TrieStateAccess<'_> {
        TrieStateAccess::new(&self.store, self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_then_access_sees_the_write() {
        let mut fixture = StateFixture::new();
        fixture.apply(1, |state| {
            state.insert(b"k", b"v").expect("insert");
        });
        assert_eq!(fixture.access().get(b"k").expect("get"), Some(b"v".to_vec()));
    }

    #[test]
    fn successive_versions_accumulate() {
        let mut fixture = StateFixture::new();
        fixture.apply(1, |state| {
            state.insert(b"a", b"1").expect("insert");
        });
        fixture.apply(2, |state| {
            state.insert(b"b", b"2").expect("insert");
        });
        let access = fixture.access();
        assert_eq!(access.get(b"a").expect("get"), Some(b"1".to_vec()));
        assert_eq!(access.get(b"b").expect("get"), Some(b"2".to_vec()));
    }
}
