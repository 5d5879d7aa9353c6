//! The on-disk path-sharding scheme (spec.md §4.9): a block keyed by
//! `(round, hash)` lives at
//! `root / (round / 10_000_000) / hash[0:3] / hash[3:6] / hash[6:9] / hash[9:].dat.zlib`.
//!
//! Sharding by the first nine bytes of the hash keeps any one directory from
//! holding more than a few thousand entries even at chain heights with
//! billions of blocks; bucketing by `round / 10_000_000` keeps the bucket
//! directory itself bounded and lets an operator archive old buckets
//! wholesale.

use std::path::{Path, PathBuf};

const ROUND_BUCKET_SIZE: u64 = 10_000_000;

/// Computes the on-disk path for the block at `(round, hash)` under `root`.
pub fn block_path(root: &Path, round: u64, hash: [u8; 32]) -> PathBuf {
    let bucket = round / ROUND_BUCKET_SIZE;
    let (shard_a, rest) = hash.split_at(3);
    let (shard_b, rest) = rest.split_at(3);
    let (shard_c, tail) = rest.split_at(3);
    root.join(bucket.to_string())
        .join(hex::encode(shard_a))
        .join(hex::encode(shard_b))
        .join(hex::encode(shard_c))
        .join(format!("{}.dat.zlib", hex::encode(tail)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_components_match_the_hash_shards() {
        let hash = [0xabu8; 32];
        let path = block_path(Path::new("/root"), 42, hash);
        let expected = Path::new("/root")
            .join("0")
            .join("ababab")
            .join("ababab")
            .join("ababab")
            .join(format!("{}.dat.zlib", "ab".repeat(23)));
        assert_eq!(path, expected);
    }

    #[test]
    fn round_bucket_advances_at_the_boundary() {
        let hash = [0u8; 32];
        let low = block_path(Path::new("/r"), 9_999_999, hash);
        let high = block_path(Path::new("/r"), 10_000_000, hash);
        assert!(low.starts_with(Path::new("/r").join("0")));
        assert!(high.starts_with(Path::new("/r").join("1")));
    }

    #[test]
    fn distinct_hashes_take_distinct_paths() {
        let a = block_path(Path::new("/r"), 1, [1u8; 32]);
        let b = block_path(Path::new("/r"), 1, [2u8; 32]);
        assert_ne!(a, b);
    }
}
