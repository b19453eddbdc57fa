//! Bazaar Registry - Profile store for autonomous agents
//!
//! The profile store is:
//! - Keyed by AgentId
//! - Pure data, mutated only through explicit update calls
//! - The single entry point for identity self-modification
//!   (goal / values / tags / archetype / visibility)
//!
//! Reputation and XP live on the profile record but are owned by the
//! reputation ledger; the store exposes a narrow setter for that crate's
//! use and nothing else touches them.

use std::collections::HashMap;
use std::sync::Arc;

use bazaar_types::{AgentId, AgentProfile, BazaarError, ProfileUpdate, Result};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// In-memory agent profile store
///
/// Thread-safe and designed for concurrent access.
#[derive(Clone, Default)]
pub struct ProfileStore {
    profiles: Arc<RwLock<HashMap<AgentId, AgentProfile>>>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new agent profile
    ///
    /// Fails if any declared value weight is outside [0, 1].
    pub async fn register(&self, profile: AgentProfile) -> Result<()> {
        validate_values(&profile.values)?;
        if !(0.0..=1.0).contains(&profile.reputation) {
            return Err(BazaarError::invalid_input(
                "reputation",
                "must be in [0, 1]",
            ));
        }

        let mut profiles = self.profiles.write().await;
        info!(agent_id = %profile.agent_id, archetype = ?profile.archetype, "agent registered");
        profiles.insert(profile.agent_id.clone(), profile);
        Ok(())
    }

    /// Look up a profile by agent id
    pub async fn get(&self, agent_id: &AgentId) -> Option<AgentProfile> {
        self.profiles.read().await.get(agent_id).cloned()
    }

    /// Look up a profile, failing with `AgentNotFound` when missing
    pub async fn require(&self, agent_id: &AgentId) -> Result<AgentProfile> {
        self.get(agent_id).await.ok_or_else(|| BazaarError::AgentNotFound {
            agent_id: agent_id.to_string(),
        })
    }

    /// Apply a self-modification to identity fields
    ///
    /// This is the only mutation path for goal, values, tags, archetype,
    /// and visibility preferences. Returns the updated profile.
    pub async fn self_modify(
        &self,
        agent_id: &AgentId,
        update: ProfileUpdate,
    ) -> Result<AgentProfile> {
        if let Some(ref values) = update.values {
            validate_values(values)?;
        }

        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(agent_id).ok_or_else(|| BazaarError::AgentNotFound {
            agent_id: agent_id.to_string(),
        })?;

        if let Some(goal) = update.goal {
            profile.goal = goal;
        }
        if let Some(values) = update.values {
            profile.values = values;
        }
        if let Some(tags) = update.tags {
            profile.tags = tags;
        }
        if let Some(archetype) = update.archetype {
            profile.archetype = archetype;
        }
        if let Some(visibility) = update.visibility {
            profile.visibility = visibility;
        }

        debug!(agent_id = %agent_id, "profile self-modified");
        Ok(profile.clone())
    }

    /// Opaque wallet handle for an agent
    pub async fn wallet_ref(&self, agent_id: &AgentId) -> Result<String> {
        Ok(self.require(agent_id).await?.wallet_ref)
    }

    /// Sync reputation and XP onto the stored profile
    ///
    /// Called by the reputation ledger after its own state commits, so
    /// profile reads observe current standing. Not a public mutation path
    /// for anything else.
    pub async fn sync_standing(&self, agent_id: &AgentId, reputation: f64, xp: u64) {
        let mut profiles = self.profiles.write().await;
        if let Some(profile) = profiles.get_mut(agent_id) {
            profile.reputation = reputation;
            profile.xp = xp;
        }
    }

    /// All registered agent ids
    pub async fn all_agents(&self) -> Vec<AgentId> {
        self.profiles.read().await.keys().cloned().collect()
    }
}

fn validate_values(values: &HashMap<String, f64>) -> Result<()> {
    for (name, weight) in values {
        if !(0.0..=1.0).contains(weight) || !weight.is_finite() {
            return Err(BazaarError::invalid_input(
                format!("values.{name}"),
                "weight must be a finite number in [0, 1]",
            ));
        }
    }
    Ok(())
}
