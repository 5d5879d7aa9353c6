//! Signature schemes: BLS for consensus messages.

pub mod bls;