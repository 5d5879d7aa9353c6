//! Block-lifecycle hooks a smart contract can opt into.

use async_trait::async_trait;

use crate::services::BlockchainService;
use crate::state::{StateContext, StateError};
use crate::transaction::context::TxContext;

/// A contract that needs to run logic once per block after every
/// transaction has executed, independent of any single transaction (spec.md
/// §4.7.2's expired-challenge sweep is the motivating case).
#[async_trait]
pub trait OnEndBlock: BlockchainService {
    async fn on_end_block(
        &self,
        state: &mut dyn StateContext,
        ctx: &TxContext,
    ) -> Result<(), StateError>;
}
