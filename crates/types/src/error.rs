//! Shared error primitives.
//!
//! Each crate defines its own domain error enum (`TrieError`,
//! `ConsensusError`, `StorageContractError`, ...); this module only holds the
//! pieces that are genuinely cross-cutting: a stable error-code trait so
//! metrics and logs never have to match on a `Display` string, and a
//! catch-all `CoreError` used at the handful of boundaries that need one
//! (e.g. hashing a canonical encoding fails).

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
///
/// Implemented by every domain error enum in the workspace so telemetry can
/// key on `err.code()` instead of matching on formatted messages.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// A catch-all error for code that has no domain-specific error type of its
/// own (codec glue, hashing, small free functions).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Wraps an arbitrary failure message from a lower layer.
    #[error("{0}")]
    Custom(String),
    /// A cryptographic operation failed.
    #[error("crypto error: {0}")]
    Crypto(String),
    /// A value could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),
}

impl ErrorCode for CoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::Custom(_) => "CORE_CUSTOM",
            Self::Crypto(_) => "CORE_CRYPTO",
            Self::Codec(_) => "CORE_CODEC",
        }
    }
}
