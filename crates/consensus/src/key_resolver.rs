//! Decouples the round machine from wherever account public keys actually
//! live (a trie-backed registry in production, a fixed map in tests).

use std::collections::BTreeMap;

use meridian_types::app::AccountId;

/// Resolves an account's registered ECDSA public key, used to verify block
/// signatures and verification tickets.
pub trait PartyKeyResolver: Send + Sync {
    fn public_key_of(&self, account: &AccountId) -> Option<Vec<u8>>;
}

/// A fixed lookup table, grounded for tests and single-process demos where
/// the committee's keys are known up front.
#[derive(Debug, Clone, Default)]
pub struct StaticKeyResolver {
    keys: BTreeMap<AccountId, Vec<u8>>,
}

impl StaticKeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, account: AccountId, public_key: Vec<u8>) -> Self {
        self.keys.insert(account, public_key);
        self
    }
}

impl PartyKeyResolver for StaticKeyResolver {
    fn public_key_of(&self, account: &AccountId) -> Option<Vec<u8>> {
        self.keys.get(account).cloned()
    }
}
