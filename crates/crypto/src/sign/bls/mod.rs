//! BLS12-381 signatures, used for VRF shares, verification tickets, and
//! DKG key shares (spec.md §3, §4.4, §4.6).
//!
//! Signatures live in G1, public keys in G2, following the teacher's
//! `BLS_SIG_BLS12381G1_XMD:SHA-256_SSWU_RO_NUL_` convention so existing
//! domain-separation tooling keeps working.

use dcrypt::algorithms::ec::bls12_381::{
    pairing, Bls12_381Scalar as Scalar, G1Affine, G1Projective, G2Affine, G2Projective,
};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::CryptoError;

const BLS_DST: &[u8] = b"BLS_SIG_BLS12381G1_XMD:SHA-256_SSWU_RO_NUL_";

#[derive(Clone)]
pub struct BlsKeyPair {
    public_key: BlsPublicKey,
    secret_key: BlsSecretKey,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlsPublicKey(pub G2Affine);

#[derive(Clone)]
pub struct BlsSecretKey(pub Scalar);

impl std::fmt::Debug for BlsSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BlsSecretKey(..)")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlsSignature(pub G1Affine);

fn random_scalar(domain: &[u8]) -> Result<Scalar, CryptoError> {
    let mut rng = OsRng;
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    Scalar::hash_to_field(&bytes, domain)
        .map_err(|e| CryptoError::KeyGen(format!("{:?}", e)))
}

fn hash_to_g1(message: &[u8]) -> Result<G1Affine, CryptoError> {
    let scalar = Scalar::hash_to_field(message, BLS_DST)
        .map_err(|e| CryptoError::Sign(format!("hash to field failed: {:?}", e)))?;
    Ok(G1Affine::from(G1Projective::generator() * scalar))
}

impl BlsKeyPair {
    pub fn generate() -> Result<Self, CryptoError> {
        let secret = random_scalar(b"MERIDIAN-BLS-KEYGEN")?;
        let public = G2Affine::from(G2Projective::generator() * secret);
        Ok(Self {
            public_key: BlsPublicKey(public),
            secret_key: BlsSecretKey(secret),
        })
    }

    pub fn from_secret(secret_key: BlsSecretKey) -> Self {
        let public = G2Affine::from(G2Projective::generator() * secret_key.0);
        Self {
            public_key: BlsPublicKey(public),
            secret_key,
        }
    }

    pub fn public_key(&self) -> BlsPublicKey {
        self.public_key.clone()
    }

    pub fn secret_key(&self) -> BlsSecretKey {
        self.secret_key.clone()
    }

    pub fn sign(&self, message: &[u8]) -> Result<BlsSignature, CryptoError> {
        self.secret_key.sign(message)
    }
}

impl BlsSecretKey {
    pub fn sign(&self, message: &[u8]) -> Result<BlsSignature, CryptoError> {
        let point = hash_to_g1(message)?;
        let sig = G1Projective::from(point) * self.0;
        Ok(BlsSignature(G1Affine::from(sig)))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidLength {
                expected: 32,
                got: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(bytes);
        let scalar = Scalar::from_bytes(&arr)
            .into_option()
            .ok_or_else(|| CryptoError::Deserialization("invalid BLS scalar".into()))?;
        Ok(Self(scalar))
    }
}

impl BlsPublicKey {
    pub fn verify(&self, message: &[u8], signature: &BlsSignature) -> Result<(), CryptoError> {
        let msg_point = hash_to_g1(message)?;
        let lhs = pairing(&signature.0, &G2Affine::generator());
        let rhs = pairing(&msg_point, &self.0);
        if lhs == rhs {
            Ok(())
        } else {
            Err(CryptoError::VerificationFailed)
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_compressed().as_ref().to_vec()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 96 {
            return Err(CryptoError::InvalidLength {
                expected: 96,
                got: bytes.len(),
            });
        }
        let mut arr = [0u8; 96];
        arr.copy_from_slice(bytes);
        let point = G2Affine::from_compressed(&arr)
            .into_option()
            .ok_or_else(|| CryptoError::Deserialization("invalid G2 point".into()))?;
        Ok(Self(point))
    }
}

impl BlsSignature {
    /// Sums a set of signatures over the same message into one aggregate
    /// point, the way threshold VRF shares are combined into the round
    /// random seed's preimage (spec.md §4.4).
    pub fn aggregate(signatures: &[BlsSignature]) -> BlsSignature {
        let mut acc = G1Projective::identity();
        for sig in signatures {
            acc += G1Projective::from(sig.0);
        }
        BlsSignature(G1Affine::from(acc))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_compressed().as_ref().to_vec()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 48 {
            return Err(CryptoError::InvalidLength {
                expected: 48,
                got: bytes.len(),
            });
        }
        let mut arr = [0u8; 48];
        arr.copy_from_slice(bytes);
        let point = G1Affine::from_compressed(&arr)
            .map_err(|_| CryptoError::Deserialization("invalid G1 point".into()))?;
        Ok(Self(point))
    }
}

/// Distributed key generation primitives (spec.md §4.6).
///
/// A contributing party picks a degree-`threshold - 1` polynomial over the
/// scalar field, evaluates it at every other party's id to produce that
/// party's share, and publishes the coefficients' G2 commitments so
/// recipients can verify a received share without trusting the sender.
pub mod dkg {
    use super::*;

    /// A party's secret polynomial for one DKG round, never transmitted.
    pub struct Polynomial {
        coefficients: Vec<Scalar>,
    }

    /// The public commitment to a `Polynomial`'s coefficients, safe to
    /// broadcast: `commitments[i] = G2::generator() * coefficients[i]`.
    #[derive(Clone)]
    pub struct VerificationVector(pub Vec<G2Affine>);

    impl Polynomial {
        /// Generates a fresh random polynomial of the given degree
        /// (`threshold - 1`), whose constant term is this party's
        /// contribution to the group secret.
        pub fn generate(threshold: usize) -> Result<Self, CryptoError> {
            let degree = threshold.saturating_sub(1);
            let coefficients = (0..=degree)
                .map(|i| random_scalar(format!("MERIDIAN-DKG-COEFF-{i}").as_bytes()))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Self { coefficients })
        }

        /// This party's contribution to the eventual group secret key.
        pub fn constant_term_secret(&self) -> BlsSecretKey {
            BlsSecretKey(self.coefficients[0])
        }

        /// Evaluates the polynomial at `party_id + 1` (ids are zero-based;
        /// evaluating at zero would leak the constant term).
        pub fn evaluate(&self, party_id: u64) -> Scalar {
            let x = Scalar::from(party_id + 1);
            let mut acc = Scalar::from(0u64);
            for coeff in self.coefficients.iter().rev() {
                acc = acc * x + *coeff;
            }
            acc
        }

        /// The public commitment recipients use to verify shares derived
        /// from this polynomial.
        pub fn verification_vector(&self) -> VerificationVector {
            VerificationVector(
                self.coefficients
                    .iter()
                    .map(|c| G2Affine::from(G2Projective::generator() * *c))
                    .collect(),
            )
        }
    }

    /// Checks that `share` is consistent with the sender's published
    /// `VerificationVector` for the recipient `party_id`, without learning
    /// the sender's polynomial.
    pub fn verify_share(
        share: &Scalar,
        party_id: u64,
        vector: &VerificationVector,
    ) -> Result<(), CryptoError> {
        let expected = G2Affine::from(G2Projective::generator() * *share);
        let x = Scalar::from(party_id + 1);
        let mut acc = G2Projective::from(vector.0[vector.0.len() - 1]);
        for commitment in vector.0[..vector.0.len() - 1].iter().rev() {
            acc = acc * x + G2Projective::from(*commitment);
        }
        if G2Affine::from(acc) == expected {
            Ok(())
        } else {
            Err(CryptoError::InvalidShare(party_id))
        }
    }

    /// Combines this party's received shares from every contributor into
    /// its final secret-key share, by summation (the shares already encode
    /// each contributor's polynomial evaluated at this party's id).
    pub fn combine_received_shares(shares: &[Scalar]) -> BlsSecretKey {
        let mut acc = Scalar::from(0u64);
        for share in shares {
            acc = acc + *share;
        }
        BlsSecretKey(acc)
    }

    /// Combines every contributor's constant-term public commitment into
    /// the group's public key.
    pub fn combine_group_public_key(constant_terms: &[G2Affine]) -> BlsPublicKey {
        let mut acc = G2Projective::identity();
        for term in constant_terms {
            acc += G2Projective::from(*term);
        }
        BlsPublicKey(G2Affine::from(acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_roundtrip() {
        let keypair = BlsKeyPair::generate().expect("keygen");
        let message = b"round-42-vrf-share";
        let signature = keypair.sign(message).expect("sign");
        assert!(keypair.public_key().verify(message, &signature).is_ok());
        assert!(keypair
            .public_key()
            .verify(b"different message", &signature)
            .is_err());
    }

    #[test]
    fn public_key_roundtrips_through_bytes() {
        let keypair = BlsKeyPair::generate().expect("keygen");
        let bytes = keypair.public_key().to_bytes();
        let restored = BlsPublicKey::from_bytes(&bytes).expect("decode");
        assert_eq!(keypair.public_key(), restored);
    }

    #[test]
    fn dkg_share_verifies_against_its_own_vector() {
        let poly = dkg::Polynomial::generate(3).expect("poly");
        let vector = poly.verification_vector();
        let share = poly.evaluate(1);
        assert!(dkg::verify_share(&share, 1, &vector).is_ok());
    }

    #[test]
    fn aggregate_is_order_independent() {
        let a = BlsKeyPair::generate().expect("keygen");
        let b = BlsKeyPair::generate().expect("keygen");
        let message = b"round-7-timeout-0";
        let sig_a = a.sign(message).expect("sign");
        let sig_b = b.sign(message).expect("sign");

        let first = BlsSignature::aggregate(&[sig_a.clone(), sig_b.clone()]);
        let second = BlsSignature::aggregate(&[sig_b, sig_a]);
        assert_eq!(first, second);
    }

    #[test]
    fn dkg_share_for_wrong_party_fails_verification() {
        let poly = dkg::Polynomial::generate(3).expect("poly");
        let vector = poly.verification_vector();
        let share = poly.evaluate(1);
        assert!(dkg::verify_share(&share, 2, &vector).is_err());
    }
}
