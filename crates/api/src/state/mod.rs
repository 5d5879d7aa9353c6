//! Core traits for state access during block execution (spec.md §4.2).

mod accessor;
mod context;

pub use accessor::{StateAccess, StateError, StateScanItem};
pub use context::StateContext;
