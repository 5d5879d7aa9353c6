//! Abstract metrics traits, decoupling core logic from the metrics
//! backend. Each trait groups the counters/gauges one subsystem reports;
//! a concrete backend (`prometheus::PrometheusSink`) implements all of
//! them at once.

use once_cell::sync::OnceCell;

/// A no-op sink for tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// The lazily-initialized global `MetricsSink`.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns the configured error sink, or a no-op sink if none was
/// installed.
pub fn error_metrics() -> &'static dyn ErrorMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns the configured dispatch-seam sink, or a no-op sink if none was
/// installed.
pub fn service_metrics() -> &'static dyn ServiceMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns the configured consensus sink, or a no-op sink if none was
/// installed.
pub fn consensus_metrics() -> &'static dyn ConsensusMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns the configured storage-contract sink, or a no-op sink if none
/// was installed.
pub fn storage_contract_metrics() -> &'static dyn StorageContractMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns the configured transport sink, or a no-op sink if none was
/// installed.
pub fn transport_metrics() -> &'static dyn TransportMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns the configured trie/block-store sink, or a no-op sink if none
/// was installed.
pub fn trie_metrics() -> &'static dyn TrieMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Metrics for the state trie and the block archive's garbage collector
/// (spec.md §3, §4.9).
pub trait TrieMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the number of sealed epochs pruned by the GC.
    fn inc_epochs_dropped(&self, count: u64);
    /// Increments the number of trie nodes deleted by the GC.
    fn inc_nodes_deleted(&self, count: u64);
    /// Increments total bytes written to the block archive.
    fn inc_bytes_written_total(&self, bytes: u64);
    /// Sets the gauge for the archive's estimated disk usage.
    fn set_disk_usage_bytes(&self, bytes: u64);
    /// Sets the gauge for the number of live reference counts tracked by
    /// the GC.
    fn set_total_ref_counts(&self, count: u64);
}
impl TrieMetricsSink for NopSink {
    fn inc_epochs_dropped(&self, _count: u64) {}
    fn inc_nodes_deleted(&self, _count: u64) {}
    fn inc_bytes_written_total(&self, _bytes: u64) {}
    fn set_disk_usage_bytes(&self, _bytes: u64) {}
    fn set_total_ref_counts(&self, _count: u64) {}
}

/// Metrics for the peer-pool transport adapter (spec.md §4.8).
pub trait TransportMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for entities broadcast, labeled by kind.
    fn inc_broadcasts_sent(&self, kind: &str);
    /// Increments the gauge for currently known peers.
    fn inc_known_peers(&self);
    /// Decrements the gauge for currently known peers.
    fn dec_known_peers(&self);
    /// Observes the latency of one `request_entity` fan-out that found a
    /// winner, labeled by kind.
    fn observe_request_entity_latency(&self, kind: &str, duration_secs: f64);
    /// Increments a counter for `request_entity` calls that ran out the
    /// clock without a validated response, labeled by kind.
    fn inc_request_entity_timeouts(&self, kind: &str);
}
impl TransportMetricsSink for NopSink {
    fn inc_broadcasts_sent(&self, _kind: &str) {}
    fn inc_known_peers(&self) {}
    fn dec_known_peers(&self) {}
    fn observe_request_entity_latency(&self, _kind: &str, _duration_secs: f64) {}
    fn inc_request_entity_timeouts(&self, _kind: &str) {}
}

/// Metrics for the round and view-change machines (spec.md §4.4, §4.5).
pub trait ConsensusMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter for blocks produced by this node.
    fn inc_blocks_produced(&self);
    /// Increments the counter for view changes this node proposed.
    fn inc_view_changes_proposed(&self);
    /// Observes the duration of a single round tick.
    fn observe_tick_duration(&self, duration_secs: f64);
}
impl ConsensusMetricsSink for NopSink {
    fn inc_blocks_produced(&self) {}
    fn inc_view_changes_proposed(&self) {}
    fn observe_tick_duration(&self, _duration_secs: f64) {}
}

/// Metrics for the storage-service contract's allocation and challenge
/// lifecycle (spec.md §4.7).
pub trait StorageContractMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter for allocations created.
    fn inc_allocations_created(&self);
    /// Increments the counter for challenges generated, labeled by
    /// whether one was actually due.
    fn inc_challenges_generated(&self);
    /// Increments the counter for challenges settled, labeled by their
    /// outcome (`"pass"`, `"fail"`, `"expired"`).
    fn inc_challenges_settled(&self, outcome: &'static str);
    /// Observes the elapsed time between challenge creation and
    /// settlement.
    fn observe_challenge_settlement_latency(&self, duration_secs: f64);
}
impl StorageContractMetricsSink for NopSink {
    fn inc_allocations_created(&self) {}
    fn inc_challenges_generated(&self) {}
    fn inc_challenges_settled(&self, _outcome: &'static str) {}
    fn observe_challenge_settlement_latency(&self, _duration_secs: f64) {}
}

/// Metrics for recording structured errors, keyed by an `ErrorCode`
/// rather than a formatted message.
pub trait ErrorMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for a specific error, categorized by its
    /// domain (crate) and its stable code.
    fn inc_error(&self, domain: &'static str, code: &'static str);
}
impl ErrorMetricsSink for NopSink {
    fn inc_error(&self, _domain: &'static str, _code: &'static str) {}
}

/// Metrics for the `BlockchainService` dispatch seam (spec.md §4.7-§4.8's
/// shared `dispatch` entry point).
pub trait ServiceMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter when a call addresses an unregistered service
    /// id.
    fn inc_unknown_service(&self, service_id: &str);
    /// Observes the latency of one `BlockchainService::dispatch` call.
    fn observe_service_dispatch_latency(&self, service_id: &str, method: &str, duration_secs: f64);
    /// Increments a counter for errors returned from `dispatch`, labeled
    /// by the error's stable code.
    fn inc_dispatch_error(&self, service_id: &str, method: &str, code: &'static str);
}
impl ServiceMetricsSink for NopSink {
    fn inc_unknown_service(&self, _service_id: &str) {}
    fn observe_service_dispatch_latency(&self, _service_id: &str, _method: &str, _duration_secs: f64) {}
    fn inc_dispatch_error(&self, _service_id: &str, _method: &str, _code: &'static str) {}
}

/// A unified sink implementing every domain-specific trait, the single
/// type a metrics backend needs to provide.
pub trait MetricsSink:
    TrieMetricsSink
    + TransportMetricsSink
    + ConsensusMetricsSink
    + StorageContractMetricsSink
    + ErrorMetricsSink
    + ServiceMetricsSink
{
}

impl<T> MetricsSink for T where
    T: TrieMetricsSink
        + TransportMetricsSink
        + ConsensusMetricsSink
        + StorageContractMetricsSink
        + ErrorMetricsSink
        + ServiceMetricsSink
{
}
