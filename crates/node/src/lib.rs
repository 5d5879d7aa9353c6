//! Orchestration and config glue: the one `Node` context a process
//! constructs at startup and threads into every component that needs it
//! (spec.md §9's redesign note on the teacher's global singletons).
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

pub mod context;
pub mod error;

pub use context::Node;
pub use error::NodeError;

pub mod prelude {
    pub use crate::context::Node;
    pub use crate::error::NodeError;
}
