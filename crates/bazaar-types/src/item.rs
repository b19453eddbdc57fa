//! Tradeable item metadata

use crate::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Metadata for a symbolic, NFT-backed item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemListing {
    pub item_id: ItemId,
    pub name: String,
    pub description: String,
    pub tags: BTreeSet<String>,
    /// Declared market value, the anchor for subjective valuation
    pub market_value: f64,
}

impl ItemListing {
    pub fn new(name: impl Into<String>, market_value: f64) -> Self {
        Self {
            item_id: ItemId::new(),
            name: name.into(),
            description: String::new(),
            tags: BTreeSet::new(),
            market_value,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

/// Free-form appraisal context tag
///
/// The engine only distinguishes coalition trades (which carry a profit
/// share cost); everything else is passed through for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeContext {
    Trade,
    Coalition,
    Other(String),
}

impl TradeContext {
    pub fn is_coalition(&self) -> bool {
        matches!(self, TradeContext::Coalition)
    }

    pub fn label(&self) -> &str {
        match self {
            TradeContext::Trade => "trade",
            TradeContext::Coalition => "coalition",
            TradeContext::Other(s) => s,
        }
    }
}
