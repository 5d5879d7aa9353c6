//! Error type shared across every cryptographic primitive in this crate.

use thiserror::Error;

use meridian_types::error::ErrorCode;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("key generation failed: {0}")]
    KeyGen(String),
    #[error("signing failed: {0}")]
    Sign(String),
    #[error("signature verification failed")]
    VerificationFailed,
    #[error("expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
    #[error("failed to deserialize: {0}")]
    Deserialization(String),
    #[error("threshold share verification failed for party {0}")]
    InvalidShare(u64),
}

impl ErrorCode for CryptoError {
    fn code(&self) -> &'static str {
        match self {
            Self::KeyGen(_) => "CRYPTO_KEYGEN",
            Self::Sign(_) => "CRYPTO_SIGN",
            Self::VerificationFailed => "CRYPTO_VERIFICATION_FAILED",
            Self::InvalidLength { .. } => "CRYPTO_INVALID_LENGTH",
            Self::Deserialization(_) => "CRYPTO_DESERIALIZATION",
            Self::InvalidShare(_) => "CRYPTO_INVALID_SHARE",
        }
    }
}
