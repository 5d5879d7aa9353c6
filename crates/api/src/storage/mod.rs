//! API for the durable, content-addressed block archive (spec.md §4.9).

use async_trait::async_trait;
use meridian_types::app::Block;
use thiserror::Error;

use crate::error::ErrorCode;

/// A block height.
pub type Height = u64;

/// Errors from the durable block archive.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("not found")]
    NotFound,
}

impl ErrorCode for StorageError {
    fn code(&self) -> &'static str {
        match self {
            Self::Backend(_) => "STORAGE_BACKEND",
            Self::Encode(_) => "STORAGE_ENCODE",
            Self::Decode(_) => "STORAGE_DECODE",
            Self::NotFound => "STORAGE_NOT_FOUND",
        }
    }
}

/// The durable, append-only, content-addressed archive a sharder persists
/// finalized blocks to (spec.md §4.9). Path-sharded and compressed
/// implementations live in `meridian-blockstore`; this trait is the seam
/// the finalization path programs against.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Persists a finalized block. Must be idempotent: storing the same
    /// block hash twice is not an error.
    async fn put_block(&self, block: &Block) -> Result<(), StorageError>;

    /// Retrieves a block by height, if one has been finalized there.
    fn get_block_by_height(&self, height: Height) -> Result<Option<Block>, StorageError>;

    /// Retrieves a block by its content hash.
    fn get_block_by_hash(&self, hash: [u8; 32]) -> Result<Option<Block>, StorageError>;

    /// Returns the highest height this store has persisted, if any.
    fn head_height(&self) -> Result<Option<Height>, StorageError>;
}
