//! # Meridian Crypto
//!
//! Cryptographic primitives: SHA3-256 content addressing, BLS12-381
//! threshold signatures for consensus messages and DKG, and ECDSA
//! transaction signing.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

pub mod ecdsa;
pub mod error;
pub mod hash;
pub mod sign;

pub mod prelude {
    pub use crate::ecdsa::EcdsaKeyPair;
    pub use crate::error::CryptoError;
    pub use crate::hash::{sha3_256, sha3_256_concat};
    pub use crate::sign::bls::{dkg, BlsKeyPair, BlsPublicKey, BlsSecretKey, BlsSignature};
}
