//! The view-change/DKG machine (spec.md §4.6): rotates the committee's
//! threshold BLS key material across magic-block boundaries.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

pub mod dkg;
pub mod error;

pub mod prelude {
    pub use crate::dkg::{DkgMachine, DkgOutcome, Phase};
    pub use crate::error::ViewChangeError;
}
