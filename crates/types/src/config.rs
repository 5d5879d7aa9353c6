//! Externalized runtime configuration.
//!
//! Mirrors the teacher's `ioi-types::config` pattern of a single
//! `serde`-deserializable TOML document with a `Default` impl that gives
//! every field a sane value for tests and single-node bring-up. Groups the
//! abstract storage-contract settings from spec.md §6 alongside the ambient
//! operational knobs (timeouts, backpressure, worker pools) that the spec
//! leaves to the implementation.

use serde::{Deserialize, Serialize};

/// Storage smart-contract settings (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageContractConfig {
    /// Length in seconds of one billing "time unit" used to scale
    /// min-lock-demand and challenge rewards.
    pub time_unit_seconds: i64,
    /// Fraction of a blobber's stake slashed per failed challenge, in
    /// [0.0, 1.0].
    pub blobber_slash: f64,
    /// Fraction of a challenge's settled amount paid to the responding
    /// validators, in [0.0, 1.0]; the remainder moves between the
    /// blobber's stake pool and the allocation's write pool.
    pub validator_reward_ratio: f64,
    /// Scales `size_per_blobber_in_GB × write_price × alloc_duration` into
    /// the min-lock-demand registered per blobber at allocation creation.
    pub min_lock_demand_ratio: f64,
    pub max_blobbers_per_allocation: usize,
    pub min_alloc_size: u64,
    pub min_alloc_duration_seconds: i64,
    pub max_challenge_completion_time_seconds: i64,
    pub free_allocation_settings: FreeAllocationSettings,
}

impl Default for StorageContractConfig {
    fn default() -> Self {
        Self {
            time_unit_seconds: 3600,
            blobber_slash: 0.10,
            validator_reward_ratio: 0.10,
            min_lock_demand_ratio: 0.10,
            max_blobbers_per_allocation: 40,
            min_alloc_size: 1_024 * 1_024,
            min_alloc_duration_seconds: 5 * 60,
            max_challenge_completion_time_seconds: 30 * 60,
            free_allocation_settings: FreeAllocationSettings::default(),
        }
    }
}

/// Per-tier parameters for the free-allocation top-up path (spec.md §4.7.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeAllocationSettings {
    pub data_shards: usize,
    pub parity_shards: usize,
    pub size: u64,
    pub duration_seconds: i64,
    pub read_price_range: (u128, u128),
    pub write_price_range: (u128, u128),
}

impl Default for FreeAllocationSettings {
    fn default() -> Self {
        Self {
            data_shards: 4,
            parity_shards: 2,
            size: 10 * 1_024 * 1_024,
            duration_seconds: 50 * 60,
            read_price_range: (0, 100),
            write_price_range: (0, 100),
        }
    }
}

/// View-change / DKG pacing (spec.md §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewChangeConfig {
    /// Number of rounds in one view-change epoch.
    pub view_change_interval_rounds: u64,
    /// Rounds before the epoch boundary at which a new DKG begins.
    pub dkg_lead_rounds: u64,
}

impl Default for ViewChangeConfig {
    fn default() -> Self {
        Self {
            view_change_interval_rounds: 250,
            dkg_lead_rounds: 50,
        }
    }
}

/// Consensus and networking knobs the spec leaves to the implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    pub vrf_timeout_ms: u64,
    pub verify_timeout_ms: u64,
    pub notarization_timeout_ms: u64,
    /// Backpressure bound K: a miner stalls round advancement once it is
    /// more than this many rounds ahead of the last round seen finalized
    /// by sharders (spec.md §4.4, REDESIGN FLAGS).
    pub max_rounds_ahead_of_sharders: u64,
    pub round_timeout_sharder_ratio: f64,
    /// Finalization-depth confirmation window `K`: MPT versions at rounds
    /// below `finalized_round - K` are pruned once a block finalizes
    /// (spec.md §4.5).
    pub finalization_depth: u64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            vrf_timeout_ms: 10_000,
            verify_timeout_ms: 3_000,
            notarization_timeout_ms: 30_000,
            max_rounds_ahead_of_sharders: 5,
            round_timeout_sharder_ratio: 0.5,
            finalization_depth: 3,
        }
    }
}

/// Worker-pool and transport sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Upper bound on how many peer requests a single `request_entity` fan-out
    /// may have in flight at once, independent of the subset size below.
    pub fan_out_concurrency: usize,
    pub request_timeout_ms: u64,
    pub gossip_worker_count: usize,
    /// Floor on how many peers a `request_entity` fan-out selects, regardless
    /// of `fan_out_percent` (spec.md §4.8's subset-size formula).
    pub fan_out_min_peers: usize,
    /// Fraction of the known peer set a `request_entity` fan-out selects, in
    /// [0.0, 1.0]; the subset size is `max(fan_out_min_peers, ceil(fan_out_percent * peers))`.
    pub fan_out_percent: f64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            fan_out_concurrency: 16,
            request_timeout_ms: 5_000,
            gossip_worker_count: 4,
            fan_out_min_peers: 4,
            fan_out_percent: 0.10,
        }
    }
}

/// Root configuration document, TOML-loadable via `serde`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageContractConfig,
    pub view_change: ViewChangeConfig,
    pub consensus: ConsensusConfig,
    pub transport: TransportConfig,
    /// Block height at and above which trie nodes are encoded with the
    /// current canonical codec rather than the pre-migration legacy layout.
    /// Resolves the dead-node-encoding Open Question (SPEC_FULL.md Design
    /// Notes) the way the original chain pinned it: as a fixed constant
    /// rather than a runtime-negotiated value.
    #[serde(default = "default_legacy_codec_height")]
    pub legacy_codec_height: u64,
}

fn default_legacy_codec_height() -> u64 {
    2_860_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageContractConfig::default(),
            view_change: ViewChangeConfig::default(),
            consensus: ConsensusConfig::default(),
            transport: TransportConfig::default(),
            legacy_codec_height: default_legacy_codec_height(),
        }
    }
}

impl Config {
    /// Parses a TOML configuration document, falling back to `Default` for
    /// any field the document omits.
    pub fn from_toml_str(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = Config::from_toml_str("").unwrap();
        assert_eq!(cfg.storage.max_blobbers_per_allocation, 40);
        assert_eq!(cfg.view_change.view_change_interval_rounds, 250);
    }

    #[test]
    fn partial_override_keeps_remaining_defaults() {
        let cfg = Config::from_toml_str(
            r#"
            [storage]
            blobber_slash = 0.25
            "#,
        )
        .unwrap();
        assert_eq!(cfg.storage.blobber_slash, 0.25);
        assert_eq!(cfg.storage.validator_reward_ratio, 0.10);
    }

    #[test]
    fn defaults_set_legacy_codec_height() {
        assert_eq!(Config::default().legacy_codec_height, 2_860_000);
    }
}
