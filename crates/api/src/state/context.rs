//! `StateContext`: the per-transaction sandboxed view of state that a smart
//! contract dispatch method actually receives (spec.md §4.2).
//!
//! Unlike raw `StateAccess`, a `StateContext` also accumulates the
//! side-effecting outputs of execution — transfers, mints, events — that
//! must be visible to the block executor after the call returns but that a
//! contract must never be able to apply directly (a contract cannot move
//! funds it was not authorized to move, nor mint tokens outside an
//! allow-list). The executor drains these buffers and applies them itself.

use meridian_types::app::{Event, Mint, Transfer};

use super::accessor::{StateAccess, StateError};

/// The capability set exposed to smart-contract dispatch methods.
///
/// An implementation wraps a `StateAccess` with a per-call buffer; buffered
/// effects are committed to the parent view only when the enclosing
/// transaction's execution has fully succeeded (see
/// `meridian-state::overlay`), never before.
pub trait StateContext: StateAccess {
    /// Records a token transfer to be applied once this transaction
    /// commits. Implementations must reject transfers where neither `from`
    /// nor `to` is the context's executing identity.
    fn add_transfer(&mut self, transfer: Transfer) -> Result<(), StateError>;

    /// Records a token mint to be applied once this transaction commits.
    /// Implementations must reject mints from a minter outside the
    /// configured allow-list.
    fn add_mint(&mut self, mint: Mint) -> Result<(), StateError>;

    /// Appends an event to this transaction's emission log, in the order
    /// emitted.
    fn emit_event(&mut self, event: Event);

    /// Drains and returns every transfer buffered so far, in emission
    /// order.
    fn take_transfers(&mut self) -> Vec<Transfer>;

    /// Drains and returns every mint buffered so far, in emission order.
    fn take_mints(&mut self) -> Vec<Mint>;

    /// Drains and returns every event buffered so far, in emission order.
    fn take_events(&mut self) -> Vec<Event>;
}
