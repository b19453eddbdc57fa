//! Trade history records

use crate::ItemId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Outcome of one trade attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeOutcome {
    Success,
    Failure,
}

/// Immutable record of one trade attempt, appended to an agent's history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub item_id: ItemId,
    pub outcome: TradeOutcome,
    pub tags: BTreeSet<String>,
    pub explanation: String,
    pub timestamp: DateTime<Utc>,
}

impl TradeRecord {
    pub fn new(item_id: ItemId, outcome: TradeOutcome, explanation: impl Into<String>) -> Self {
        Self {
            item_id,
            outcome,
            tags: BTreeSet::new(),
            explanation: explanation.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_tags(mut self, tags: BTreeSet<String>) -> Self {
        self.tags = tags;
        self
    }
}
