//! Coalition types

use crate::{AgentId, CoalitionId, SPLIT_TOLERANCE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Coalition lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoalitionStatus {
    /// Proposed, waiting for every member to accept
    Proposed,
    /// All members accepted; payoff split is live
    Active,
    /// Terminal; the coalition cannot be reactivated
    Dissolved,
}

/// A consenting group of agents sharing payoffs proportionally to reputation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coalition {
    pub coalition_id: CoalitionId,
    /// Non-empty while status is Active
    pub members: BTreeSet<AgentId>,
    /// Members who have not yet accepted the proposal
    pub pending: BTreeSet<AgentId>,
    pub status: CoalitionStatus,
    /// Member → share; invariant: shares sum to 1.0 ± `SPLIT_TOLERANCE`
    /// while the coalition is Active
    pub payoff_split: BTreeMap<AgentId, f64>,
    pub created_at: DateTime<Utc>,
}

impl Coalition {
    /// Whether the stored split satisfies the sum-to-one invariant
    pub fn split_is_consistent(&self) -> bool {
        let total: f64 = self.payoff_split.values().sum();
        (total - 1.0).abs() <= SPLIT_TOLERANCE
    }
}
