//! The durable, content-addressed block archive (spec.md §4.9): a
//! path-sharded, zlib-compressed, append-only file store implementing
//! `meridian_api::storage::NodeStore`.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

mod index;
/// The on-disk path-sharding scheme.
pub mod path;
mod store;

pub use store::PathArchive;

pub mod prelude {
    pub use crate::path::block_path;
    pub use crate::store::PathArchive;
    pub use meridian_api::storage::{Height, NodeStore, StorageError};
}
