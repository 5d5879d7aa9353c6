//! Structured logging initialization and Prometheus metrics sinks for
//! every other Meridian crate, kept independent of any one crate's
//! domain types so the trie, transport, consensus, and storage-contract
//! layers can all report through the same seam.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

/// The initialization routine for global structured logging.
pub mod init;
/// The concrete `MetricsSink` backed by the `prometheus` crate.
pub mod prometheus;
/// Abstract `*MetricsSink` traits, one per subsystem.
pub mod sinks;
/// A RAII timer that reports a round tick's duration on drop.
pub mod time;

pub use sinks::{
    consensus_metrics, error_metrics, service_metrics, storage_contract_metrics, trie_metrics,
    transport_metrics,
};

pub mod prelude {
    pub use crate::init::init_tracing;
    pub use crate::prometheus::{install, set_node_state, PrometheusSink};
    pub use crate::sinks::{
        consensus_metrics, error_metrics, service_metrics, storage_contract_metrics, trie_metrics,
        transport_metrics, ConsensusMetricsSink, ErrorMetricsSink, MetricsSink, NopSink,
        ServiceMetricsSink, StorageContractMetricsSink, TransportMetricsSink, TrieMetricsSink,
    };
    pub use crate::time::Timer;
}
