//! The read-only execution context smart contracts are invoked with.

pub mod context;
