//! Bazaar Reputation Ledger
//!
//! Tracks each agent's rolling reputation, XP, and append-only trade
//! history.
//!
//! # Invariants
//!
//! 1. Reputation is always in [0, 1]
//! 2. Trade records are append-only, never deleted
//! 3. All mutations for one agent are serialized per agent id
//!
//! Per-agent serialization comes from the shard locks of the backing
//! `DashMap`: every mutation runs inside a single `entry` access, so two
//! negotiations touching the same agent never interleave mid-update.

use bazaar_types::{AgentId, BazaarError, ItemId, Result, TradeOutcome, TradeRecord};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Neutral baseline used for unknown agents and empty histories
pub const NEUTRAL_BASELINE: f64 = 0.5;

/// Reputation delta applied to both parties on an accepted trade
pub const ACCEPT_REPUTATION_DELTA: f64 = 0.05;

/// Reputation delta applied to the proposer on a rejected trade
pub const REJECT_REPUTATION_DELTA: f64 = -0.02;

/// XP granted to each party when a trade settles successfully
pub const TRADE_XP_GRANT: u64 = 10;

/// Standing of one agent in the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStanding {
    pub reputation: f64,
    pub xp: u64,
    pub history: Vec<TradeRecord>,
}

impl Default for AgentStanding {
    fn default() -> Self {
        Self {
            reputation: NEUTRAL_BASELINE,
            xp: 0,
            history: Vec::new(),
        }
    }
}

/// The reputation ledger
///
/// Thread-safe; each agent's entry is its own serialization domain.
#[derive(Clone, Default)]
pub struct ReputationLedger {
    standings: Arc<DashMap<AgentId, AgentStanding>>,
}

impl ReputationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a trade record to an agent's history
    pub fn record_trade(&self, agent_id: &AgentId, record: TradeRecord) {
        let mut standing = self.standings.entry(agent_id.clone()).or_default();
        debug!(
            agent_id = %agent_id,
            item_id = %record.item_id,
            outcome = ?record.outcome,
            "trade recorded"
        );
        standing.history.push(record);
    }

    /// Adjust an agent's reputation by a delta, clamped to [0, 1]
    ///
    /// Returns the new reputation.
    pub fn adjust_reputation(&self, agent_id: &AgentId, delta: f64) -> f64 {
        let mut standing = self.standings.entry(agent_id.clone()).or_default();
        standing.reputation = (standing.reputation + delta).clamp(0.0, 1.0);
        standing.reputation
    }

    /// Grant XP with a reason
    pub fn grant_xp(&self, agent_id: &AgentId, amount: u64, reason: &str) -> u64 {
        let mut standing = self.standings.entry(agent_id.clone()).or_default();
        standing.xp = standing.xp.saturating_add(amount);
        info!(agent_id = %agent_id, amount, reason, xp = standing.xp, "xp granted");
        standing.xp
    }

    /// Spend XP, failing if the agent cannot cover the amount
    pub fn spend_xp(&self, agent_id: &AgentId, amount: u64) -> Result<u64> {
        let mut standing = self.standings.entry(agent_id.clone()).or_default();
        if standing.xp < amount {
            return Err(BazaarError::InsufficientFunds {
                agent_id: agent_id.to_string(),
                requested: amount as f64,
                available: standing.xp as f64,
            });
        }
        standing.xp -= amount;
        Ok(standing.xp)
    }

    /// Current reputation; unknown agents read as the neutral baseline
    pub fn reputation(&self, agent_id: &AgentId) -> f64 {
        self.standings
            .get(agent_id)
            .map(|s| s.reputation)
            .unwrap_or(NEUTRAL_BASELINE)
    }

    /// Current XP
    pub fn xp(&self, agent_id: &AgentId) -> u64 {
        self.standings.get(agent_id).map(|s| s.xp).unwrap_or(0)
    }

    /// Historical success rate in [0, 1]; neutral when there is no history
    pub fn success_rate(&self, agent_id: &AgentId) -> f64 {
        match self.standings.get(agent_id) {
            Some(standing) if !standing.history.is_empty() => {
                let successes = standing
                    .history
                    .iter()
                    .filter(|r| r.outcome == TradeOutcome::Success)
                    .count();
                successes as f64 / standing.history.len() as f64
            }
            _ => NEUTRAL_BASELINE,
        }
    }

    /// Full trade history for an agent, oldest first
    pub fn history(&self, agent_id: &AgentId) -> Vec<TradeRecord> {
        self.standings
            .get(agent_id)
            .map(|s| s.history.clone())
            .unwrap_or_default()
    }

    /// Current standing snapshot (reputation, xp)
    pub fn standing(&self, agent_id: &AgentId) -> (f64, u64) {
        self.standings
            .get(agent_id)
            .map(|s| (s.reputation, s.xp))
            .unwrap_or((NEUTRAL_BASELINE, 0))
    }

    /// Settle an accepted trade: both parties succeed
    pub fn settle_accept(&self, proposer: &AgentId, target: &AgentId, item_id: &ItemId) {
        for agent in [proposer, target] {
            self.record_trade(
                agent,
                TradeRecord::new(item_id.clone(), TradeOutcome::Success, "trade accepted"),
            );
            self.adjust_reputation(agent, ACCEPT_REPUTATION_DELTA);
            self.grant_xp(agent, TRADE_XP_GRANT, "trade settled");
        }
    }

    /// Settle a rejected trade: proposer's history records the failure,
    /// no ownership change anywhere
    pub fn settle_reject(&self, proposer: &AgentId, item_id: &ItemId, explanation: &str) {
        self.record_trade(
            proposer,
            TradeRecord::new(item_id.clone(), TradeOutcome::Failure, explanation),
        );
        self.adjust_reputation(proposer, REJECT_REPUTATION_DELTA);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reputation_stays_bounded() {
        let ledger = ReputationLedger::new();
        let agent = AgentId::new();

        // Hammer upward past 1.0
        for _ in 0..100 {
            ledger.adjust_reputation(&agent, 0.3);
        }
        assert_eq!(ledger.reputation(&agent), 1.0);

        // Hammer downward past 0.0
        for _ in 0..100 {
            ledger.adjust_reputation(&agent, -0.7);
        }
        assert_eq!(ledger.reputation(&agent), 0.0);
    }

    #[test]
    fn test_unknown_agent_reads_neutral() {
        let ledger = ReputationLedger::new();
        assert_eq!(ledger.reputation(&AgentId::new()), NEUTRAL_BASELINE);
        assert_eq!(ledger.success_rate(&AgentId::new()), NEUTRAL_BASELINE);
    }

    #[test]
    fn test_success_rate() {
        let ledger = ReputationLedger::new();
        let agent = AgentId::new();
        let item = ItemId::new();

        ledger.record_trade(
            &agent,
            TradeRecord::new(item.clone(), TradeOutcome::Success, "won"),
        );
        ledger.record_trade(
            &agent,
            TradeRecord::new(item.clone(), TradeOutcome::Success, "won"),
        );
        ledger.record_trade(&agent, TradeRecord::new(item, TradeOutcome::Failure, "lost"));

        let rate = ledger.success_rate(&agent);
        assert!((rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_spend_xp_insufficient() {
        let ledger = ReputationLedger::new();
        let agent = AgentId::new();

        ledger.grant_xp(&agent, 5, "seed");
        let result = ledger.spend_xp(&agent, 10);
        assert!(matches!(result, Err(BazaarError::InsufficientFunds { .. })));
        // Balance untouched on failure
        assert_eq!(ledger.xp(&agent), 5);
    }

    #[test]
    fn test_settle_accept_updates_both_parties() {
        let ledger = ReputationLedger::new();
        let a = AgentId::new();
        let b = AgentId::new();
        let item = ItemId::new();

        ledger.settle_accept(&a, &b, &item);

        assert_eq!(ledger.history(&a).len(), 1);
        assert_eq!(ledger.history(&b).len(), 1);
        assert!(ledger.reputation(&a) > NEUTRAL_BASELINE);
        assert!(ledger.reputation(&b) > NEUTRAL_BASELINE);
        assert_eq!(ledger.xp(&a), TRADE_XP_GRANT);
    }

    #[test]
    fn test_settle_reject_touches_only_proposer() {
        let ledger = ReputationLedger::new();
        let a = AgentId::new();
        let b = AgentId::new();
        let item = ItemId::new();

        ledger.settle_reject(&a, &item, "declined");

        assert_eq!(ledger.history(&a).len(), 1);
        assert!(ledger.history(&b).is_empty());
        assert!(ledger.reputation(&a) < NEUTRAL_BASELINE);
        assert_eq!(ledger.reputation(&b), NEUTRAL_BASELINE);
    }
}
