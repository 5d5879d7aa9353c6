//! An append-only log of `(round, hash)` pairs, replayed at startup to
//! rebuild the in-memory height/hash index without scanning the
//! path-sharded archive tree (a block's on-disk path only recovers its
//! full hash, not its exact round — only the round's bucket).
//!
//! Adapted from a write-ahead log's append-and-sync discipline: each record
//! is fixed-size (no length prefix needed, since the payload shape never
//! varies), and every append is flushed and fsynced before returning so a
//! crash never loses a record the caller believes was durable.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use meridian_api::storage::StorageError;
use parking_lot::Mutex;

const RECORD_LEN: usize = 8 + 32;

/// A `(round, hash)` pair recovered from the index log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRecord {
    pub round: u64,
    pub hash: [u8; 32],
}

/// Reads every record from the index log at `path`, in append order.
/// A missing file is treated as an empty log.
pub fn load(path: &Path) -> Result<Vec<IndexRecord>, StorageError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::Backend(e.to_string())),
    };
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| StorageError::Backend(e.to_string()))?;
    let usable = bytes.len() - (bytes.len() % RECORD_LEN);
    if usable != bytes.len() {
        tracing::warn!(
            trailing_bytes = bytes.len() - usable,
            "index log ends with a partial record, truncating"
        );
    }
    let (usable_bytes, _trailing) = bytes.split_at(usable);
    let mut records = Vec::with_capacity(usable / RECORD_LEN);
    for chunk in usable_bytes.chunks_exact(RECORD_LEN) {
        let (round_bytes, hash_bytes) = chunk.split_at(8);
        let round = u64::from_le_bytes(round_bytes.try_into().unwrap_or_default());
        let hash: [u8; 32] = hash_bytes.try_into().unwrap_or([0u8; 32]);
        records.push(IndexRecord { round, hash });
    }
    Ok(records)
}

/// The append-only writer half of the index log.
pub struct IndexLog {
    path: PathBuf,
    file: Mutex<BufWriter<File>>,
}

impl IndexLog {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record, flushing and fsyncing before returning.
    pub fn append(&self, round: u64, hash: [u8; 32]) -> Result<(), StorageError> {
        let mut writer = self.file.lock();
        writer
            .write_all(&round.to_le_bytes())
            .and_then(|_| writer.write_all(&hash))
            .and_then(|_| writer.flush())
            .and_then(|_| writer.get_ref().sync_data())
            .map_err(|e| StorageError::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_appended_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("index.log");
        let log = IndexLog::open(&path).expect("open");
        log.append(1, [1u8; 32]).expect("append");
        log.append(2, [2u8; 32]).expect("append");
        let records = load(&path).expect("load");
        assert_eq!(
            records,
            vec![
                IndexRecord {
                    round: 1,
                    hash: [1u8; 32]
                },
                IndexRecord {
                    round: 2,
                    hash: [2u8; 32]
                },
            ]
        );
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let records = load(&dir.path().join("absent.log")).expect("load");
        assert!(records.is_empty());
    }

    #[test]
    fn truncated_trailing_record_is_dropped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("index.log");
        let log = IndexLog::open(&path).expect("open");
        log.append(1, [1u8; 32]).expect("append");
        {
            let mut file = OpenOptions::new()
                .append(true)
                .open(&path)
                .expect("reopen");
            file.write_all(&[0u8; 10]).expect("partial write");
        }
        let records = load(&path).expect("load");
        assert_eq!(records, vec![IndexRecord { round: 1, hash: [1u8; 32] }]);
    }
}
