//! ECDSA over secp256k1, used for transaction signing (spec.md §4.1, §6).
//!
//! Kept separate from the BLS module: transaction signatures are verified
//! one at a time by whichever miner executes the transaction, so there is
//! no benefit to a pairing-based scheme here, unlike verification tickets
//! and VRF shares where threshold collection matters.

use k256::ecdsa::signature::{Signer, Verifier as _};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use crate::error::CryptoError;

/// A secp256k1 keypair for transaction signing.
pub struct EcdsaKeyPair {
    signing_key: SigningKey,
}

impl EcdsaKeyPair {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let signing_key = SigningKey::from_slice(bytes)
            .map_err(|e| CryptoError::Deserialization(e.to_string()))?;
        Ok(Self { signing_key })
    }

    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.signing_key
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(message);
        signature.to_der().as_bytes().to_vec()
    }
}

/// Verifies a DER-encoded ECDSA signature against a compressed
/// secp256k1 public key.
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
    let verifying_key = VerifyingKey::from_sec1_bytes(public_key)
        .map_err(|e| CryptoError::Deserialization(e.to_string()))?;
    let signature =
        Signature::from_der(signature).map_err(|e| CryptoError::Deserialization(e.to_string()))?;
    verifying_key
        .verify(message, &signature)
        .map_err(|_| CryptoError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_roundtrip() {
        let keypair = EcdsaKeyPair::generate();
        let message = b"transfer 100 tokens";
        let signature = keypair.sign(message);
        assert!(verify(&keypair.public_key_bytes(), message, &signature).is_ok());
    }

    #[test]
    fn tampered_message_fails_verification() {
        let keypair = EcdsaKeyPair::generate();
        let signature = keypair.sign(b"original");
        assert!(verify(&keypair.public_key_bytes(), b"tampered", &signature).is_err());
    }
}
