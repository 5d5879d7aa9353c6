//! Deterministic keypair fixtures. Production code always draws keys from
//! `BlsKeyPair::generate`/`EcdsaKeyPair::generate`, which are `OsRng`-backed
//! and therefore unreproducible; tests instead derive a keypair from a
//! small integer index so a failing test names a fixed, reconstructible
//! key rather than a random one.

use meridian_crypto::ecdsa::EcdsaKeyPair;
use meridian_crypto::hash::sha3_256;
use meridian_crypto::sign::bls::{BlsKeyPair, BlsSecretKey};

/// Hashes `domain`, `index`, and `attempt` into a candidate 32-byte seed.
/// `attempt` lets the callers below do rejection sampling against a field
/// modulus without ever panicking on an out-of-range digest.
fn candidate_seed(domain: &[u8], index: u64, attempt: u64) -> [u8; 32] {
    sha3_256(&[domain, &index.to_le_bytes(), &attempt.to_le_bytes()].concat())
}

/// A deterministic BLS keypair for party `index`. The same index always
/// yields the same keypair, so multi-party tests (DKG, threshold
/// notarization) can refer to "party 0's key" without threading a keypair
/// through every fixture.
pub fn bls_keypair(index: u64) -> BlsKeyPair {
    let mut attempt = 0u64;
    let secret = loop {
        let seed = candidate_seed(b"MERIDIAN-TEST-BLS", index, attempt);
        if let Ok(secret) = BlsSecretKey::from_bytes(&seed) {
            break secret;
        }
        attempt += 1;
    };
    BlsKeyPair::from_secret(secret)
}

/// A deterministic ECDSA keypair for party `index`, used for test
/// transaction signing.
pub fn ecdsa_keypair(index: u64) -> EcdsaKeyPair {
    let mut attempt = 0u64;
    loop {
        let seed = candidate_seed(b"MERIDIAN-TEST-ECDSA", index, attempt);
        if let Ok(keypair) = EcdsaKeyPair::from_bytes(&seed) {
            return keypair;
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_index_gives_the_same_bls_keypair() {
        let a = bls_keypair(3);
        let b = bls_keypair(3);
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn distinct_indices_give_distinct_bls_keypairs() {
        let a = bls_keypair(0);
        let b = bls_keypair(1);
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn bls_keypair_signs_and_verifies() {
        let keypair = bls_keypair(7);
        let signature = keypair.sign(b"message").expect("sign");
        assert!(keypair.public_key().verify(b"message", &signature).is_ok());
    }

    #[test]
    fn same_index_gives_the_same_ecdsa_keypair() {
        let a = ecdsa_keypair(5);
        let b = ecdsa_keypair(5);
        assert_eq!(a.public_key_bytes(), b.public_key_bytes());
    }

    #[test]
    fn distinct_indices_give_distinct_ecdsa_keypairs() {
        let a = ecdsa_keypair(0);
        let b = ecdsa_keypair(1);
        assert_ne!(a.public_key_bytes(), b.public_key_bytes());
    }
}
