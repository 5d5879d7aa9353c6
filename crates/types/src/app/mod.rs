//! Core application-level entities: accounts, blocks, rounds, magic blocks,
//! DKG messages, settlement, penalties, and timing.

mod consensus;
mod events;
mod identity;
mod penalties;
mod settlement;
mod timing;
mod txn;

pub use consensus::{Block, DkgKeyShare, MagicBlock, PartyId, ShareOrSigns, VerificationTicket, VrfShare};
pub use events::{Event, EventTag, EventType};
pub use identity::{AccountId, ChainId};
pub use penalties::{offense_id, OffenseFacts, OffenseReport, OffenseType};
pub use settlement::{Mint, Transfer};
pub use timing::{duration_in_time_units, RoundTimingParams, Timestamp};
pub use txn::{Txn, TxnPayload};
