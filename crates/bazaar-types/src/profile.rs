//! Agent profile types

use crate::{AgentId, Archetype};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Per-category sharing preferences for public broadcasts
///
/// Everything defaults to private. The reciprocal-sharing check itself is
/// the broadcast collaborator's job; the core only carries the prefs along
/// with each published event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityPrefs {
    pub show_goal: bool,
    pub show_trade_history: bool,
    pub show_public_snippet: bool,
}

/// Identity record of one autonomous agent
///
/// `reputation` and `xp` are mutated only through the reputation ledger;
/// `goal`, `values`, `tags`, and `archetype` only through the profile
/// store's self-modification entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub agent_id: AgentId,
    /// Free-text goal driving alignment scoring
    pub goal: String,
    /// Named value weights, each in [0, 1]
    pub values: HashMap<String, f64>,
    pub tags: BTreeSet<String>,
    pub archetype: Archetype,
    pub visibility: VisibilityPrefs,
    /// Rolling reputation, invariant: always in [0, 1]
    pub reputation: f64,
    pub xp: u64,
    /// Opaque handle to the agent's wallet; never interpreted here
    pub wallet_ref: String,
}

impl AgentProfile {
    /// Create a profile with neutral reputation and no history
    pub fn new(agent_id: AgentId, goal: impl Into<String>, archetype: Archetype) -> Self {
        Self {
            agent_id,
            goal: goal.into(),
            values: HashMap::new(),
            tags: BTreeSet::new(),
            archetype,
            visibility: VisibilityPrefs::default(),
            reputation: 0.5,
            xp: 0,
            wallet_ref: String::new(),
        }
    }

    /// Builder-style value weight
    pub fn with_value(mut self, name: impl Into<String>, weight: f64) -> Self {
        self.values.insert(name.into(), weight);
        self
    }

    /// Builder-style tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Builder-style wallet reference
    pub fn with_wallet(mut self, wallet_ref: impl Into<String>) -> Self {
        self.wallet_ref = wallet_ref.into();
        self
    }

    /// Builder-style visibility preferences
    pub fn with_visibility(mut self, visibility: VisibilityPrefs) -> Self {
        self.visibility = visibility;
        self
    }
}

/// Partial update applied through the profile store's self-modification call
///
/// Only identity fields appear here; reputation and XP have their own
/// update path in the reputation ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub goal: Option<String>,
    pub values: Option<HashMap<String, f64>>,
    pub tags: Option<BTreeSet<String>>,
    pub archetype: Option<Archetype>,
    pub visibility: Option<VisibilityPrefs>,
}
