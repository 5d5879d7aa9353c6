//! Re-exports the cross-cutting error primitives from `meridian-types`.

pub use meridian_types::error::{CoreError, ErrorCode};
