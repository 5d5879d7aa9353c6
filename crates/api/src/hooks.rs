//! `RoundHooks`: the single seam for injecting test/fault-injection
//! behavior into the round machine.
//!
//! The original chain gated byzantine test paths behind build tags
//! compiled only into test binaries. That couples test-only control flow
//! into the production round machine's source. Here the round machine
//! instead takes a `&dyn RoundHooks` and calls it at a few fixed points;
//! production wiring uses `NoopRoundHooks`, and tests supply an
//! implementation that perturbs timing, drops shares, or double-signs.

use meridian_types::app::{Block, VerificationTicket, VrfShare};

/// Observation points in the round machine a test harness can act on.
/// Every method has a no-op default so a hook implementation only needs to
/// override what it cares about.
pub trait RoundHooks: Send + Sync {
    /// Called after this node generates its own VRF share, before
    /// broadcasting it. Returning `false` suppresses the broadcast.
    fn before_broadcast_vrf_share(&self, _share: &VrfShare) -> bool {
        true
    }

    /// Called after this node proposes a block, before broadcasting it.
    /// Returning `false` suppresses the broadcast.
    fn before_broadcast_proposal(&self, _block: &Block) -> bool {
        true
    }

    /// Called after this node signs a verification ticket, before
    /// broadcasting it. Returning `false` suppresses the broadcast.
    fn before_broadcast_ticket(&self, _ticket: &VerificationTicket) -> bool {
        true
    }
}

/// The production implementation: every hook is a no-op, so the round
/// machine behaves exactly as if no hooks existed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRoundHooks;

impl RoundHooks for NoopRoundHooks {}
