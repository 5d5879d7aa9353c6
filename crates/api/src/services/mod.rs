//! The dispatch trait every smart contract implements (spec.md §4.7).
//!
//! Calls are routed by a `"method@version"` string pulled straight off the
//! transaction's `SmartContract` payload, the way the teacher's
//! `provider_registry::BlockchainService` dispatches `handle_service_call`
//! — generalized here so it is not specific to one contract.

use std::any::Any;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::state::StateContext;
use crate::transaction::context::TxContext;

pub mod access;

/// A smart contract addressable by a fixed, lowercase identifier (e.g.
/// `"storagesc"`).
#[async_trait]
pub trait BlockchainService: Any + Send + Sync {
    /// The stable identifier transactions address this contract by.
    fn id(&self) -> &str;

    /// Provides access to the concrete type for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Dispatches a call keyed by `"method@version"` against this
    /// contract's state namespace. `input` is the transaction's opaque
    /// payload bytes, already validated to be addressed to this contract.
    async fn dispatch(
        &self,
        state: &mut dyn StateContext,
        method_at_version: &str,
        input: &[u8],
        ctx: &TxContext,
    ) -> Result<Vec<u8>, CoreError>;
}
