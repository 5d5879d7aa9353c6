//! Errors raised while bootstrapping or driving a node process.

use meridian_api::storage::StorageError;
use meridian_consensus::error::ConsensusError;
use meridian_types::error::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("consensus error: {0}")]
    Consensus(#[from] ConsensusError),
    #[error("block archive error: {0}")]
    Storage(#[from] StorageError),
}

impl ErrorCode for NodeError {
    fn code(&self) -> &'static str {
        match self {
            Self::ConfigRead { .. } => "NODE_CONFIG_READ",
            Self::ConfigParse(_) => "NODE_CONFIG_PARSE",
            Self::Consensus(_) => "NODE_CONSENSUS",
            Self::Storage(_) => "NODE_STORAGE",
        }
    }
}
