//! Wire shape for the non-authoritative event/telemetry bus (spec.md §4.2,
//! §6): `(type, tag, id, payload)` tuples emitted per committed block in
//! emission order and projected out to a read model that is itself out of
//! scope for this core.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// The category of entity an event describes, e.g. `"allocation"`,
/// `"challenge"`, `"block"`.
pub type EventType = String;
/// A free-form sub-classification within `EventType`, e.g. `"finalized"`.
pub type EventTag = String;

/// One emitted event. `payload` is the wire-codec encoding (see
/// `crate::codec`) of whatever entity the event describes.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct Event {
    pub block_round: u64,
    /// Position of this event within its block's emission order.
    pub sequence: u64,
    pub event_type: EventType,
    pub tag: EventTag,
    pub entity_id: String,
    pub payload: Vec<u8>,
}
