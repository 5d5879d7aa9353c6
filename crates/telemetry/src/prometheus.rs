//! Concrete `MetricsSink` backed by the `prometheus` crate's default
//! registry. Kept internal-only: this crate never opens a listening
//! socket, an embedder scrapes `prometheus::gather()` on whatever HTTP
//! surface it already runs.
//!
//! Every collector access here can legitimately panic: a lookup before
//! `install()` has run is a startup bug, not a recoverable condition.
#![allow(clippy::expect_used)]

use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_gauge, register_gauge_vec, register_histogram,
    register_histogram_vec, register_int_counter, register_int_counter_vec, Gauge, GaugeVec,
    Histogram, HistogramVec, IntCounter, IntCounterVec,
};

use crate::sinks::*;

static TRIE_DISK_USAGE_BYTES: OnceCell<Gauge> = OnceCell::new();
static TRIE_REF_COUNTS: OnceCell<Gauge> = OnceCell::new();
static TRIE_EPOCHS_DROPPED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static TRIE_NODES_DELETED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static TRIE_BYTES_WRITTEN_TOTAL: OnceCell<IntCounter> = OnceCell::new();

static TRANSPORT_KNOWN_PEERS: OnceCell<Gauge> = OnceCell::new();
static TRANSPORT_BROADCASTS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static TRANSPORT_REQUEST_TIMEOUTS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static TRANSPORT_REQUEST_LATENCY_SECONDS: OnceCell<HistogramVec> = OnceCell::new();

static CONSENSUS_BLOCKS_PRODUCED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static CONSENSUS_VIEW_CHANGES_PROPOSED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static CONSENSUS_TICK_DURATION_SECONDS: OnceCell<Histogram> = OnceCell::new();

static STORAGE_ALLOCATIONS_CREATED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static STORAGE_CHALLENGES_GENERATED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static STORAGE_CHALLENGES_SETTLED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static STORAGE_CHALLENGE_SETTLEMENT_LATENCY_SECONDS: OnceCell<Histogram> = OnceCell::new();

static ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static SVC_UNKNOWN_SERVICE_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static SVC_DISPATCH_LATENCY_SECONDS: OnceCell<HistogramVec> = OnceCell::new();
static SVC_DISPATCH_ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

static NODE_STATE: OnceCell<GaugeVec> = OnceCell::new();

#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

/// Fetches a metric collector registered by [`install`]. Panics if
/// `install()` was never called, which indicates a startup bug rather
/// than a recoverable runtime condition.
macro_rules! get_metric {
    ($metric:ident) => {
        $metric
            .get()
            .expect("prometheus sink not initialized; call telemetry::prometheus::install() first")
    };
}

impl TrieMetricsSink for PrometheusSink {
    fn inc_epochs_dropped(&self, count: u64) {
        get_metric!(TRIE_EPOCHS_DROPPED_TOTAL).inc_by(count);
    }
    fn inc_nodes_deleted(&self, count: u64) {
        get_metric!(TRIE_NODES_DELETED_TOTAL).inc_by(count);
    }
    fn inc_bytes_written_total(&self, bytes: u64) {
        get_metric!(TRIE_BYTES_WRITTEN_TOTAL).inc_by(bytes);
    }
    fn set_disk_usage_bytes(&self, bytes: u64) {
        get_metric!(TRIE_DISK_USAGE_BYTES).set(bytes as f64);
    }
    fn set_total_ref_counts(&self, count: u64) {
        get_metric!(TRIE_REF_COUNTS).set(count as f64);
    }
}

impl TransportMetricsSink for PrometheusSink {
    fn inc_broadcasts_sent(&self, kind: &str) {
        get_metric!(TRANSPORT_BROADCASTS_TOTAL)
            .with_label_values(&[kind])
            .inc();
    }
    fn inc_known_peers(&self) {
        get_metric!(TRANSPORT_KNOWN_PEERS).inc();
    }
    fn dec_known_peers(&self) {
        get_metric!(TRANSPORT_KNOWN_PEERS).dec();
    }
    fn observe_request_entity_latency(&self, kind: &str, duration_secs: f64) {
        get_metric!(TRANSPORT_REQUEST_LATENCY_SECONDS)
            .with_label_values(&[kind])
            .observe(duration_secs);
    }
    fn inc_request_entity_timeouts(&self, kind: &str) {
        get_metric!(TRANSPORT_REQUEST_TIMEOUTS_TOTAL)
            .with_label_values(&[kind])
            .inc();
    }
}

impl ConsensusMetricsSink for PrometheusSink {
    fn inc_blocks_produced(&self) {
        get_metric!(CONSENSUS_BLOCKS_PRODUCED_TOTAL).inc();
    }
    fn inc_view_changes_proposed(&self) {
        get_metric!(CONSENSUS_VIEW_CHANGES_PROPOSED_TOTAL).inc();
    }
    fn observe_tick_duration(&self, duration_secs: f64) {
        get_metric!(CONSENSUS_TICK_DURATION_SECONDS).observe(duration_secs);
    }
}

impl StorageContractMetricsSink for PrometheusSink {
    fn inc_allocations_created(&self) {
        get_metric!(STORAGE_ALLOCATIONS_CREATED_TOTAL).inc();
    }
    fn inc_challenges_generated(&self) {
        get_metric!(STORAGE_CHALLENGES_GENERATED_TOTAL).inc();
    }
    fn inc_challenges_settled(&self, outcome: &'static str) {
        get_metric!(STORAGE_CHALLENGES_SETTLED_TOTAL)
            .with_label_values(&[outcome])
            .inc();
    }
    fn observe_challenge_settlement_latency(&self, duration_secs: f64) {
        get_metric!(STORAGE_CHALLENGE_SETTLEMENT_LATENCY_SECONDS).observe(duration_secs);
    }
}

impl ErrorMetricsSink for PrometheusSink {
    fn inc_error(&self, domain: &'static str, code: &'static str) {
        get_metric!(ERRORS_TOTAL).with_label_values(&[domain, code]).inc();
    }
}

impl ServiceMetricsSink for PrometheusSink {
    fn inc_unknown_service(&self, service_id: &str) {
        get_metric!(SVC_UNKNOWN_SERVICE_TOTAL)
            .with_label_values(&[service_id])
            .inc();
    }
    fn observe_service_dispatch_latency(&self, service_id: &str, method: &str, duration_secs: f64) {
        get_metric!(SVC_DISPATCH_LATENCY_SECONDS)
            .with_label_values(&[service_id, method])
            .observe(duration_secs);
    }
    fn inc_dispatch_error(&self, service_id: &str, method: &str, code: &'static str) {
        get_metric!(SVC_DISPATCH_ERRORS_TOTAL)
            .with_label_values(&[service_id, method, code])
            .inc();
    }
}

/// Sets the informational node-state gauge vector (one of
/// `"initializing"`, `"syncing"`, `"synced"` is 1, the rest 0).
pub fn set_node_state(state_name: &str) {
    if let Some(gauge) = NODE_STATE.get() {
        for state in &["initializing", "syncing", "synced"] {
            gauge
                .with_label_values(&[state])
                .set(if *state == state_name { 1.0 } else { 0.0 });
        }
    }
}

/// Registers every metric collector against the default Prometheus
/// registry and returns a static reference to the sink. Must be called
/// exactly once at process startup.
pub fn install() -> Result<&'static dyn MetricsSink, prometheus::Error> {
    TRIE_DISK_USAGE_BYTES
        .set(register_gauge!(
            "meridian_trie_disk_usage_bytes",
            "Estimated total disk usage of the block archive."
        )?)
        .expect("static already initialized");
    TRIE_REF_COUNTS
        .set(register_gauge!(
            "meridian_trie_ref_counts",
            "Total live reference counts tracked for trie GC."
        )?)
        .expect("static already initialized");
    TRIE_EPOCHS_DROPPED_TOTAL
        .set(register_int_counter!(
            "meridian_trie_epochs_dropped_total",
            "Total sealed epochs dropped by GC."
        )?)
        .expect("static already initialized");
    TRIE_NODES_DELETED_TOTAL
        .set(register_int_counter!(
            "meridian_trie_nodes_deleted_total",
            "Total trie nodes deleted by GC."
        )?)
        .expect("static already initialized");
    TRIE_BYTES_WRITTEN_TOTAL
        .set(register_int_counter!(
            "meridian_trie_bytes_written_total",
            "Total bytes written to the block archive."
        )?)
        .expect("static already initialized");
    TRANSPORT_KNOWN_PEERS
        .set(register_gauge!(
            "meridian_transport_known_peers",
            "Current number of known peers."
        )?)
        .expect("static already initialized");
    TRANSPORT_BROADCASTS_TOTAL
        .set(register_int_counter_vec!(
            "meridian_transport_broadcasts_total",
            "Total entities sent via broadcast_entity.",
            &["kind"]
        )?)
        .expect("static already initialized");
    TRANSPORT_REQUEST_TIMEOUTS_TOTAL
        .set(register_int_counter_vec!(
            "meridian_transport_request_timeouts_total",
            "Total request_entity fan-outs that found no validated response in time.",
            &["kind"]
        )?)
        .expect("static already initialized");
    TRANSPORT_REQUEST_LATENCY_SECONDS
        .set(register_histogram_vec!(
            "meridian_transport_request_latency_seconds",
            "Latency of a request_entity fan-out that found a winner.",
            &["kind"],
            exponential_buckets(0.001, 2.0, 15)?
        )?)
        .expect("static already initialized");
    CONSENSUS_BLOCKS_PRODUCED_TOTAL
        .set(register_int_counter!(
            "meridian_consensus_blocks_produced_total",
            "Total blocks produced by this node."
        )?)
        .expect("static already initialized");
    CONSENSUS_VIEW_CHANGES_PROPOSED_TOTAL
        .set(register_int_counter!(
            "meridian_consensus_view_changes_proposed_total",
            "Total view changes proposed by this node."
        )?)
        .expect("static already initialized");
    CONSENSUS_TICK_DURATION_SECONDS
        .set(register_histogram!(
            "meridian_consensus_tick_duration_seconds",
            "Latency of a single round tick.",
            exponential_buckets(0.002, 2.0, 15)?
        )?)
        .expect("static already initialized");
    STORAGE_ALLOCATIONS_CREATED_TOTAL
        .set(register_int_counter!(
            "meridian_storage_allocations_created_total",
            "Total allocations created."
        )?)
        .expect("static already initialized");
    STORAGE_CHALLENGES_GENERATED_TOTAL
        .set(register_int_counter!(
            "meridian_storage_challenges_generated_total",
            "Total challenges generated."
        )?)
        .expect("static already initialized");
    STORAGE_CHALLENGES_SETTLED_TOTAL
        .set(register_int_counter_vec!(
            "meridian_storage_challenges_settled_total",
            "Total challenges settled, labeled by outcome.",
            &["outcome"]
        )?)
        .expect("static already initialized");
    STORAGE_CHALLENGE_SETTLEMENT_LATENCY_SECONDS
        .set(register_histogram!(
            "meridian_storage_challenge_settlement_latency_seconds",
            "Time between challenge creation and settlement.",
            exponential_buckets(1.0, 2.0, 15)?
        )?)
        .expect("static already initialized");
    ERRORS_TOTAL
        .set(register_int_counter_vec!(
            "meridian_errors_total",
            "Total errors, labeled by crate domain and stable error code.",
            &["domain", "code"]
        )?)
        .expect("static already initialized");
    SVC_UNKNOWN_SERVICE_TOTAL
        .set(register_int_counter_vec!(
            "meridian_service_unknown_total",
            "Total dispatch calls addressed to an unregistered service id.",
            &["service_id"]
        )?)
        .expect("static already initialized");
    SVC_DISPATCH_LATENCY_SECONDS
        .set(register_histogram_vec!(
            "meridian_service_dispatch_latency_seconds",
            "Latency of BlockchainService::dispatch calls.",
            &["service_id", "method"],
            exponential_buckets(0.0001, 2.0, 16)?
        )?)
        .expect("static already initialized");
    SVC_DISPATCH_ERRORS_TOTAL
        .set(register_int_counter_vec!(
            "meridian_service_dispatch_errors_total",
            "Total errors returned from BlockchainService::dispatch.",
            &["service_id", "method", "code"]
        )?)
        .expect("static already initialized");
    NODE_STATE
        .set(register_gauge_vec!(
            "meridian_node_state",
            "Current node lifecycle state (1 for the active state, 0 otherwise).",
            &["state"]
        )?)
        .expect("static already initialized");

    static SINK: PrometheusSink = PrometheusSink;
    Ok(&SINK)
}
