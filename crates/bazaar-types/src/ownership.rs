//! Ownership records
//!
//! Records are created only by the ownership chain's mint operation and
//! never mutated afterwards, except the single `is_current` flip performed
//! atomically with the next mint for the same item.

use crate::{AgentId, CorrelationId, ItemId, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One link in an item's provenance chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipRecord {
    pub record_id: RecordId,
    pub item_id: ItemId,
    pub owner: AgentId,
    /// Exactly one record per item has this set at any time
    pub is_current: bool,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: CorrelationId,
}

/// Expected prior owner for an optimistic mint
///
/// `Owner`/`Unowned` turn the mint into a compare-and-swap on the current
/// owner; `Any` always succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerPrecondition {
    /// No precondition; mint unconditionally
    Any,
    /// The item must never have been minted (or its chain is empty)
    Unowned,
    /// The item's current owner must be exactly this agent
    Owner(AgentId),
}
