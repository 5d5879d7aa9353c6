//! Deterministic block/round timing helpers shared by the round machine and
//! the storage contract's time-unit-scaled settlement math.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Unix-epoch seconds. Kept as a distinct type so "timestamp" and "duration"
/// are never accidentally swapped at a call site.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Encode, Decode,
)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn saturating_sub(self, other: Timestamp) -> i64 {
        self.0.saturating_sub(other.0)
    }

    pub fn add_seconds(self, seconds: i64) -> Timestamp {
        Timestamp(self.0.saturating_add(seconds))
    }
}

/// Parameters governing deterministic round pacing, consulted by the round
/// machine's timeout logic (spec.md §4.4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Encode, Decode)]
pub struct RoundTimingParams {
    /// Wall-clock deadline for VRF completion before bumping the round's
    /// timeout count.
    pub vrf_timeout_ms: u64,
    /// Default block verification timeout (spec.md §5): 3000ms.
    pub verify_timeout_ms: u64,
    /// Default notarization processing timeout (spec.md §5): 30000ms.
    pub notarization_timeout_ms: u64,
}

impl Default for RoundTimingParams {
    fn default() -> Self {
        Self {
            vrf_timeout_ms: 10_000,
            verify_timeout_ms: 3_000,
            notarization_timeout_ms: 30_000,
        }
    }
}

/// Computes the number of whole `time_unit`-sized periods between two
/// timestamps, used to scale min-lock-demand and challenge rewards
/// (spec.md §4.7.1, §4.7.2).
pub fn duration_in_time_units(from: Timestamp, to: Timestamp, time_unit_seconds: i64) -> f64 {
    if time_unit_seconds <= 0 {
        return 0.0;
    }
    let elapsed = to.saturating_sub(from).max(0);
    elapsed as f64 / time_unit_seconds as f64
}
