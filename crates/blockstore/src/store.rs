//! A [`NodeStore`] backed by the path-sharded, zlib-compressed archive
//! described in [`crate::path`].
//!
//! Reads are synchronous (the trait requires it) and go straight to disk;
//! the in-memory index only ever holds `(height, hash)` pairs, not block
//! bodies, so it stays small even over a long-running chain. Writes run the
//! actual disk I/O on the blocking thread pool, since `flate2` and
//! `std::fs` are synchronous.

use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use meridian_api::storage::{Height, NodeStore, StorageError};
use meridian_types::app::Block;
use meridian_types::codec::{from_bytes_canonical, to_bytes_canonical};
use parking_lot::Mutex;

use crate::index::{self, IndexLog};
use crate::path::block_path;

struct ArchiveIndex {
    round_to_hash: BTreeMap<u64, [u8; 32]>,
    hash_to_round: HashMap<[u8; 32], u64>,
}

impl ArchiveIndex {
    fn from_records(records: &[index::IndexRecord]) -> Self {
        let mut round_to_hash = BTreeMap::new();
        let mut hash_to_round = HashMap::new();
        for record in records {
            round_to_hash.insert(record.round, record.hash);
            hash_to_round.insert(record.hash, record.round);
        }
        Self {
            round_to_hash,
            hash_to_round,
        }
    }
}

/// A durable, path-sharded block archive rooted at one directory.
pub struct PathArchive {
    root: PathBuf,
    log: IndexLog,
    index: Mutex<ArchiveIndex>,
}

impl PathArchive {
    /// Opens (creating if absent) the archive rooted at `root`, replaying
    /// its index log to rebuild the in-memory height/hash lookup.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| StorageError::Backend(e.to_string()))?;
        let log_path = root.join("index.log");
        let records = index::load(&log_path)?;
        let index = ArchiveIndex::from_records(&records);
        let log = IndexLog::open(&log_path)?;
        Ok(Self {
            root,
            log,
            index: Mutex::new(index),
        })
    }

    fn read_block(&self, round: u64, hash: [u8; 32]) -> Result<Option<Block>, StorageError> {
        let path = block_path(&self.root, round, hash);
        let compressed = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Backend(e.to_string())),
        };
        let mut decoder = ZlibDecoder::new(compressed.as_slice());
        let mut bytes = Vec::new();
        decoder
            .read_to_end(&mut bytes)
            .map_err(|e| StorageError::Decode(e.to_string()))?;
        let block = from_bytes_canonical::<Block>(&bytes).map_err(|e| StorageError::Decode(e.to_string()))?;
        Ok(Some(block))
    }
}

fn write_compressed(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::Backend(e.to_string()))?;
    }
    let file = std::fs::File::create(path).map_err(|e| StorageError::Backend(e.to_string()))?;
    let mut encoder = ZlibEncoder::new(file, Compression::default());
    encoder
        .write_all(bytes)
        .map_err(|e| StorageError::Backend(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| StorageError::Backend(e.to_string()))?;
    Ok(())
}

#[async_trait]
impl NodeStore for PathArchive {
    async fn put_block(&self, block: &Block) -> Result<(), StorageError> {
        let already_present = self.index.lock().hash_to_round.contains_key(&block.hash);
        if already_present {
            return Ok(());
        }

        let round = block.round;
        let hash = block.hash;
        let path = block_path(&self.root, round, hash);
        let bytes = to_bytes_canonical(block);
        tokio::task::spawn_blocking(move || write_compressed(&path, &bytes))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))??;

        self.log.append(round, hash)?;
        let mut index = self.index.lock();
        index.round_to_hash.insert(round, hash);
        index.hash_to_round.insert(hash, round);
        Ok(())
    }

    fn get_block_by_height(&self, height: Height) -> Result<Option<Block>, StorageError> {
        let hash = match self.index.lock().round_to_hash.get(&height) {
            Some(hash) => *hash,
            None => return Ok(None),
        };
        self.read_block(height, hash)
    }

    fn get_block_by_hash(&self, hash: [u8; 32]) -> Result<Option<Block>, StorageError> {
        let round = match self.index.lock().hash_to_round.get(&hash) {
            Some(round) => *round,
            None => return Ok(None),
        };
        self.read_block(round, hash)
    }

    fn head_height(&self) -> Result<Option<Height>, StorageError> {
        Ok(self.index.lock().round_to_hash.keys().next_back().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_types::app::AccountId;
    use std::collections::BTreeMap as StdBTreeMap;

    fn sample_block(round: u64, hash: [u8; 32]) -> Block {
        Block {
            round,
            prev_hash: [0u8; 32],
            hash,
            miner_id: AccountId::from_public_key(b"miner"),
            round_random_seed: 7,
            transactions: Vec::new(),
            verification_tickets: StdBTreeMap::new(),
            signature: Vec::new(),
            state_root: [0u8; 32],
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips_by_hash_and_height() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = PathArchive::open(dir.path()).expect("open");
        let block = sample_block(5, [9u8; 32]);
        archive.put_block(&block).await.expect("put");

        let by_hash = archive
            .get_block_by_hash([9u8; 32])
            .expect("get by hash")
            .expect("present");
        assert_eq!(by_hash.round, 5);

        let by_height = archive
            .get_block_by_height(5)
            .expect("get by height")
            .expect("present");
        assert_eq!(by_height.hash, [9u8; 32]);
    }

    #[tokio::test]
    async fn put_block_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = PathArchive::open(dir.path()).expect("open");
        let block = sample_block(1, [1u8; 32]);
        archive.put_block(&block).await.expect("put 1");
        archive.put_block(&block).await.expect("put 2");
        assert_eq!(archive.head_height().expect("head"), Some(1));
    }

    #[tokio::test]
    async fn head_height_tracks_the_highest_round() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = PathArchive::open(dir.path()).expect("open");
        archive.put_block(&sample_block(3, [3u8; 32])).await.expect("put 3");
        archive.put_block(&sample_block(1, [1u8; 32])).await.expect("put 1");
        archive.put_block(&sample_block(9, [9u8; 32])).await.expect("put 9");
        assert_eq!(archive.head_height().expect("head"), Some(9));
    }

    #[tokio::test]
    async fn missing_height_and_hash_return_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = PathArchive::open(dir.path()).expect("open");
        assert_eq!(archive.get_block_by_height(42).expect("height"), None);
        assert_eq!(archive.get_block_by_hash([0u8; 32]).expect("hash"), None);
        assert_eq!(archive.head_height().expect("head"), None);
    }

    #[tokio::test]
    async fn index_log_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let archive = PathArchive::open(dir.path()).expect("open");
            archive.put_block(&sample_block(2, [2u8; 32])).await.expect("put");
        }
        let reopened = PathArchive::open(dir.path()).expect("reopen");
        assert_eq!(reopened.head_height().expect("head"), Some(2));
        assert_eq!(
            reopened
                .get_block_by_hash([2u8; 32])
                .expect("get")
                .map(|b| b.round),
            Some(2)
        );
    }
}
