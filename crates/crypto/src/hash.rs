//! SHA3-256, the canonical content-addressing hash used for account ids,
//! trie node addressing, and offense ids (spec.md §4.1, §4.2, §7).

use sha3::{Digest, Sha3_256};

/// Hashes `data` and returns the raw 32-byte digest.
pub fn sha3_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Hashes the concatenation of every slice in `parts`, in order. Equivalent
/// to `sha3_256(&parts.concat())` but avoids the intermediate allocation.
pub fn sha3_256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_matches_manual_concat() {
        let a = sha3_256_concat(&[b"foo", b"bar"]);
        let b = sha3_256(b"foobar");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_inputs_give_distinct_digests() {
        assert_ne!(sha3_256(b"a"), sha3_256(b"b"));
    }
}
