//! The `StateAccess` trait: the narrow, dyn-safe key-value interface every
//! layer above the trie talks to.

use thiserror::Error;

use crate::error::ErrorCode;

/// Errors raised by a `StateAccess` implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("value at key could not be decoded: {0}")]
    InvalidValue(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl ErrorCode for StateError {
    fn code(&self) -> &'static str {
        match self {
            Self::Backend(_) => "STATE_BACKEND",
            Self::InvalidValue(_) => "STATE_INVALID_VALUE",
            Self::Unauthorized(_) => "STATE_UNAUTHORIZED",
        }
    }
}

/// A streamed key-value pair from a prefix scan.
pub type StateScanItem = Result<(Vec<u8>, Vec<u8>), StateError>;

/// A dyn-safe trait erasing the concrete trie/store type so services and the
/// round machine's execution path can read and write state without knowing
/// whether they are backed by the live trie or a sandboxed per-block
/// overlay (see `StateContext` in `meridian-state`).
pub trait StateAccess: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError>;
    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError>;
    fn delete(&mut self, key: &[u8]) -> Result<(), StateError>;
    /// Returns every stored key-value pair whose key starts with `prefix`,
    /// in key order (spec.md §4.2's partitioned sets rely on this for
    /// ordered iteration).
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<StateScanItem>, StateError>;
}

impl<T: StateAccess + ?Sized> StateAccess for Box<T> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        (**self).get(key)
    }

    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        (**self).insert(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        (**self).delete(key)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<StateScanItem>, StateError> {
        (**self).prefix_scan(prefix)
    }
}
