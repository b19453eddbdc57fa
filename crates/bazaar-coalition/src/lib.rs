//! Bazaar Coalition Manager
//!
//! Forms, merges, and dissolves profit-sharing coalitions. Payoff shares
//! are weighted by member reputation with an epsilon floor so no member is
//! ever excluded entirely.
//!
//! Each coalition is its own serialization domain: mutations run under the
//! backing `DashMap` entry lock for that coalition id, so operations on
//! unrelated coalitions never contend. No operation holds two coalition
//! locks at once; `merge` touches its two coalitions strictly one at a
//! time. Lock order across structures is coalition entry before reputation
//! entry, never the reverse.
//!
//! # Invariants
//!
//! 1. An Active coalition has a non-empty member set
//! 2. Active payoff shares sum to 1.0 ± `SPLIT_TOLERANCE`, checked before
//!    any write commits
//! 3. Dissolved is terminal; operations against a dissolved coalition
//!    fail with `InvalidCoalitionState`

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use bazaar_reputation::ReputationLedger;
use bazaar_types::{
    AgentId, BazaarError, Coalition, CoalitionId, CoalitionStatus, Result,
    REPUTATION_SPLIT_FLOOR, SPLIT_TOLERANCE,
};
use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info};

/// XP granted per unit of payoff when a coalition payout is applied
pub const PAYOFF_XP_SCALE: f64 = 10.0;

/// Reputation-weighted payoff split with an epsilon floor
///
/// Each share is `floored_i / Σ floored_j` where a zero reputation is
/// floored to `REPUTATION_SPLIT_FLOOR` before normalizing.
pub fn weighted_split(reputations: &BTreeMap<AgentId, f64>) -> BTreeMap<AgentId, f64> {
    let floored: BTreeMap<&AgentId, f64> = reputations
        .iter()
        .map(|(id, rep)| {
            let rep = if *rep == 0.0 { REPUTATION_SPLIT_FLOOR } else { *rep };
            (id, rep)
        })
        .collect();
    let total: f64 = floored.values().sum();

    floored
        .into_iter()
        .map(|(id, rep)| (id.clone(), rep / total))
        .collect()
}

/// The coalition manager
#[derive(Clone, Default)]
pub struct CoalitionManager {
    reputation: ReputationLedger,
    coalitions: Arc<DashMap<CoalitionId, Coalition>>,
}

impl CoalitionManager {
    pub fn new(reputation: ReputationLedger) -> Self {
        Self {
            reputation,
            coalitions: Arc::new(DashMap::new()),
        }
    }

    fn compute_split(&self, members: &BTreeSet<AgentId>) -> Result<BTreeMap<AgentId, f64>> {
        let reputations: BTreeMap<AgentId, f64> = members
            .iter()
            .map(|id| (id.clone(), self.reputation.reputation(id)))
            .collect();
        let split = weighted_split(&reputations);

        // Invariant check before anything commits
        let total: f64 = split.values().sum();
        if (total - 1.0).abs() > SPLIT_TOLERANCE {
            return Err(BazaarError::internal(format!(
                "payoff split sums to {total}, expected 1.0"
            )));
        }
        Ok(split)
    }

    /// Propose a coalition; every member starts pending
    pub fn propose(&self, members: BTreeSet<AgentId>) -> Result<Coalition> {
        if members.is_empty() {
            return Err(BazaarError::invalid_input(
                "members",
                "a coalition needs at least one member",
            ));
        }

        let coalition = Coalition {
            coalition_id: CoalitionId::new(),
            pending: members.clone(),
            members,
            status: CoalitionStatus::Proposed,
            payoff_split: BTreeMap::new(),
            created_at: Utc::now(),
        };

        info!(
            coalition_id = %coalition.coalition_id,
            members = coalition.members.len(),
            "coalition proposed"
        );
        self.coalitions
            .insert(coalition.coalition_id.clone(), coalition.clone());
        Ok(coalition)
    }

    /// Record one member's acceptance; activates once everyone accepted
    pub fn accept(&self, coalition_id: &CoalitionId, member_id: &AgentId) -> Result<Coalition> {
        let mut coalition = self.require_entry(coalition_id)?;

        match coalition.status {
            CoalitionStatus::Proposed => {}
            status => {
                return Err(BazaarError::InvalidCoalitionState {
                    coalition_id: coalition_id.to_string(),
                    state: format!("{status:?}"),
                    required: "Proposed".to_string(),
                })
            }
        }
        if !coalition.members.contains(member_id) {
            return Err(BazaarError::NotACoalitionMember {
                coalition_id: coalition_id.to_string(),
                agent_id: member_id.to_string(),
            });
        }

        coalition.pending.remove(member_id);
        if coalition.pending.is_empty() {
            let split = self.compute_split(&coalition.members)?;
            coalition.payoff_split = split;
            coalition.status = CoalitionStatus::Active;
            info!(coalition_id = %coalition_id, "coalition active");
        } else {
            debug!(
                coalition_id = %coalition_id,
                member_id = %member_id,
                remaining = coalition.pending.len(),
                "coalition acceptance recorded"
            );
        }
        Ok(coalition.clone())
    }

    /// Merge coalition `source` into `target`
    ///
    /// Idempotent: when the source's members are already a subset of the
    /// target's, both coalitions are left untouched and the target is
    /// returned unchanged. Otherwise the source's members join the
    /// target, the split is recomputed, and the source dissolves. The two
    /// entry locks are taken one at a time, never together: source read,
    /// target write, source write.
    pub fn merge(&self, target_id: &CoalitionId, source_id: &CoalitionId) -> Result<Coalition> {
        let source_members = {
            let source = self.require_ref(source_id)?;
            Self::require_active(&source)?;
            source.members.clone()
        };

        let merged = {
            let mut target = self.require_entry(target_id)?;
            Self::require_active(&target)?;

            if source_members.is_subset(&target.members) {
                debug!(
                    target = %target_id,
                    source = %source_id,
                    "merge is a no-op, source already subsumed"
                );
                return Ok(target.clone());
            }

            target.members.extend(source_members.iter().cloned());
            target.payoff_split = self.compute_split(&target.members)?;
            target.clone()
        };

        {
            let mut source = self.require_entry(source_id)?;
            source.status = CoalitionStatus::Dissolved;
            source.payoff_split.clear();
        }

        info!(
            target = %target_id,
            source = %source_id,
            members = merged.members.len(),
            "coalitions merged"
        );
        Ok(merged)
    }

    /// Remove one member; dissolves the coalition when the last one leaves
    pub fn leave(&self, coalition_id: &CoalitionId, member_id: &AgentId) -> Result<Coalition> {
        let mut coalition = self.require_entry(coalition_id)?;
        Self::require_active(&coalition)?;

        if !coalition.members.remove(member_id) {
            return Err(BazaarError::NotACoalitionMember {
                coalition_id: coalition_id.to_string(),
                agent_id: member_id.to_string(),
            });
        }

        if coalition.members.is_empty() {
            coalition.status = CoalitionStatus::Dissolved;
            coalition.payoff_split.clear();
            info!(coalition_id = %coalition_id, "last member left, coalition dissolved");
        } else {
            let split = self.compute_split(&coalition.members)?;
            coalition.payoff_split = split;
            debug!(coalition_id = %coalition_id, member_id = %member_id, "member left");
        }
        Ok(coalition.clone())
    }

    /// Dissolve a coalition; terminal
    pub fn dissolve(&self, coalition_id: &CoalitionId) -> Result<()> {
        let mut coalition = self.require_entry(coalition_id)?;
        if coalition.status == CoalitionStatus::Dissolved {
            return Err(BazaarError::InvalidCoalitionState {
                coalition_id: coalition_id.to_string(),
                state: "Dissolved".to_string(),
                required: "Proposed or Active".to_string(),
            });
        }
        coalition.status = CoalitionStatus::Dissolved;
        coalition.payoff_split.clear();
        info!(coalition_id = %coalition_id, "coalition dissolved");
        Ok(())
    }

    /// Recompute the split after reputation changes outside membership ops
    pub fn refresh_split(&self, coalition_id: &CoalitionId) -> Result<Coalition> {
        let mut coalition = self.require_entry(coalition_id)?;
        Self::require_active(&coalition)?;
        let split = self.compute_split(&coalition.members)?;
        coalition.payoff_split = split;
        Ok(coalition.clone())
    }

    /// Current payoff split for an Active coalition
    pub fn split(&self, coalition_id: &CoalitionId) -> Result<BTreeMap<AgentId, f64>> {
        let coalition = self.require_ref(coalition_id)?;
        Self::require_active(&coalition)?;
        Ok(coalition.payoff_split.clone())
    }

    /// Apply a payoff: each member's share of the total, as XP grants
    ///
    /// Returns the fiat-equivalent amounts per member.
    pub fn apply_payoff(
        &self,
        coalition_id: &CoalitionId,
        total_payoff: f64,
    ) -> Result<BTreeMap<AgentId, f64>> {
        let split = self.split(coalition_id)?;
        let mut amounts = BTreeMap::new();
        for (member, share) in &split {
            let amount = share * total_payoff;
            let xp = (amount * PAYOFF_XP_SCALE).round() as u64;
            self.reputation
                .grant_xp(member, xp, &format!("coalition payoff {coalition_id}"));
            amounts.insert(member.clone(), amount);
        }
        Ok(amounts)
    }

    /// Look up a coalition
    pub fn get(&self, coalition_id: &CoalitionId) -> Option<Coalition> {
        self.coalitions.get(coalition_id).map(|c| c.clone())
    }

    fn require_ref(
        &self,
        coalition_id: &CoalitionId,
    ) -> Result<dashmap::mapref::one::Ref<'_, CoalitionId, Coalition>> {
        self.coalitions
            .get(coalition_id)
            .ok_or_else(|| BazaarError::CoalitionNotFound {
                coalition_id: coalition_id.to_string(),
            })
    }

    fn require_entry(
        &self,
        coalition_id: &CoalitionId,
    ) -> Result<dashmap::mapref::one::RefMut<'_, CoalitionId, Coalition>> {
        self.coalitions
            .get_mut(coalition_id)
            .ok_or_else(|| BazaarError::CoalitionNotFound {
                coalition_id: coalition_id.to_string(),
            })
    }

    fn require_active(coalition: &Coalition) -> Result<()> {
        if coalition.status != CoalitionStatus::Active {
            return Err(BazaarError::InvalidCoalitionState {
                coalition_id: coalition.coalition_id.to_string(),
                state: format!("{:?}", coalition.status),
                required: "Active".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_coalition(manager: &CoalitionManager, members: &[AgentId]) -> Coalition {
        let set: BTreeSet<AgentId> = members.iter().cloned().collect();
        let coalition = manager.propose(set).unwrap();
        let mut latest = coalition.clone();
        for member in members {
            latest = manager.accept(&coalition.coalition_id, member).unwrap();
        }
        latest
    }

    fn set_reputation(ledger: &ReputationLedger, agent: &AgentId, value: f64) {
        // Drive from the 0.5 default to the target value
        let current = ledger.reputation(agent);
        ledger.adjust_reputation(agent, value - current);
    }

    #[test]
    fn test_weighted_split_basic() {
        let a = AgentId::new();
        let b = AgentId::new();
        let reps: BTreeMap<AgentId, f64> =
            [(a.clone(), 0.8), (b.clone(), 0.2)].into_iter().collect();

        let split = weighted_split(&reps);
        assert!((split[&a] - 0.8).abs() < 1e-9);
        assert!((split[&b] - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_split_epsilon_floor() {
        // A zero-reputation member is floored to 0.01 before renormalizing
        let a = AgentId::new();
        let b = AgentId::new();
        let reps: BTreeMap<AgentId, f64> =
            [(a.clone(), 0.0), (b.clone(), 1.2)].into_iter().collect();

        let split = weighted_split(&reps);
        assert!((split[&a] - 0.01 / 1.21).abs() < 1e-9);
        assert!((split[&b] - 1.2 / 1.21).abs() < 1e-9);
        let total: f64 = split.values().sum();
        assert!((total - 1.0).abs() <= SPLIT_TOLERANCE);
    }

    #[test]
    fn test_weighted_split_all_zero() {
        let reps: BTreeMap<AgentId, f64> = (0..3).map(|_| (AgentId::new(), 0.0)).collect();
        let split = weighted_split(&reps);
        for share in split.values() {
            assert!((share - 1.0 / 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_lifecycle_propose_accept_activate() {
        let ledger = ReputationLedger::new();
        let manager = CoalitionManager::new(ledger.clone());
        let a = AgentId::new();
        let b = AgentId::new();
        set_reputation(&ledger, &a, 0.8);
        set_reputation(&ledger, &b, 0.2);

        let set: BTreeSet<AgentId> = [a.clone(), b.clone()].into_iter().collect();
        let coalition = manager.propose(set).unwrap();
        assert_eq!(coalition.status, CoalitionStatus::Proposed);

        let after_one = manager.accept(&coalition.coalition_id, &a).unwrap();
        assert_eq!(after_one.status, CoalitionStatus::Proposed);

        let active = manager.accept(&coalition.coalition_id, &b).unwrap();
        assert_eq!(active.status, CoalitionStatus::Active);
        assert!((active.payoff_split[&a] - 0.8).abs() < 1e-9);
        assert!((active.payoff_split[&b] - 0.2).abs() < 1e-9);
        assert!(active.split_is_consistent());
    }

    #[test]
    fn test_refresh_after_reputation_drop() {
        let ledger = ReputationLedger::new();
        let manager = CoalitionManager::new(ledger.clone());
        let a = AgentId::new();
        let b = AgentId::new();
        set_reputation(&ledger, &a, 0.8);
        set_reputation(&ledger, &b, 0.2);

        let coalition = active_coalition(&manager, &[a.clone(), b.clone()]);

        set_reputation(&ledger, &a, 0.0);
        let refreshed = manager.refresh_split(&coalition.coalition_id).unwrap();

        // Floored: a -> 0.01, b stays 0.2; shares renormalize
        assert!((refreshed.payoff_split[&a] - 0.01 / 0.21).abs() < 1e-9);
        assert!((refreshed.payoff_split[&b] - 0.2 / 0.21).abs() < 1e-9);
        assert!(refreshed.split_is_consistent());
    }

    #[test]
    fn test_merge_and_idempotence() {
        let ledger = ReputationLedger::new();
        let manager = CoalitionManager::new(ledger.clone());
        let a = AgentId::new();
        let b = AgentId::new();
        let c = AgentId::new();

        let target = active_coalition(&manager, &[a.clone(), b.clone()]);
        let source = active_coalition(&manager, &[c.clone()]);

        let merged = manager
            .merge(&target.coalition_id, &source.coalition_id)
            .unwrap();
        assert_eq!(merged.members.len(), 3);
        assert!(merged.split_is_consistent());

        // Source is gone
        let source_after = manager.get(&source.coalition_id).unwrap();
        assert_eq!(source_after.status, CoalitionStatus::Dissolved);

        // Second merge fails on the dissolved source, but merging an
        // already-subsumed live coalition is a no-op
        let subset = active_coalition(&manager, &[a.clone()]);
        let first = manager
            .merge(&merged.coalition_id, &subset.coalition_id)
            .unwrap();
        let second = manager
            .merge(&merged.coalition_id, &subset.coalition_id)
            .unwrap();
        assert_eq!(first.members, second.members);
        assert_eq!(first.payoff_split, second.payoff_split);
        // The subsumed coalition is untouched
        let subset_after = manager.get(&subset.coalition_id).unwrap();
        assert_eq!(subset_after.status, CoalitionStatus::Active);
    }

    #[test]
    fn test_merge_into_itself_is_a_no_op() {
        let manager = CoalitionManager::new(ReputationLedger::new());
        let a = AgentId::new();
        let coalition = active_coalition(&manager, &[a]);

        let merged = manager
            .merge(&coalition.coalition_id, &coalition.coalition_id)
            .unwrap();
        assert_eq!(merged.members, coalition.members);
        assert_eq!(merged.status, CoalitionStatus::Active);
    }

    #[test]
    fn test_dissolved_is_terminal() {
        let ledger = ReputationLedger::new();
        let manager = CoalitionManager::new(ledger);
        let a = AgentId::new();

        let coalition = active_coalition(&manager, &[a.clone()]);
        manager.dissolve(&coalition.coalition_id).unwrap();

        for result in [
            manager.dissolve(&coalition.coalition_id),
            manager.accept(&coalition.coalition_id, &a).map(|_| ()),
            manager.leave(&coalition.coalition_id, &a).map(|_| ()),
            manager.split(&coalition.coalition_id).map(|_| ()),
        ] {
            assert!(matches!(
                result,
                Err(BazaarError::InvalidCoalitionState { .. })
            ));
        }
    }

    #[test]
    fn test_leave_recomputes_and_last_leave_dissolves() {
        let ledger = ReputationLedger::new();
        let manager = CoalitionManager::new(ledger.clone());
        let a = AgentId::new();
        let b = AgentId::new();

        let coalition = active_coalition(&manager, &[a.clone(), b.clone()]);

        let after = manager.leave(&coalition.coalition_id, &a).unwrap();
        assert_eq!(after.members.len(), 1);
        assert!((after.payoff_split[&b] - 1.0).abs() < 1e-9);

        let dissolved = manager.leave(&coalition.coalition_id, &b).unwrap();
        assert_eq!(dissolved.status, CoalitionStatus::Dissolved);
    }

    #[test]
    fn test_apply_payoff_grants_xp() {
        let ledger = ReputationLedger::new();
        let manager = CoalitionManager::new(ledger.clone());
        let a = AgentId::new();
        let b = AgentId::new();
        set_reputation(&ledger, &a, 0.8);
        set_reputation(&ledger, &b, 0.2);

        let coalition = active_coalition(&manager, &[a.clone(), b.clone()]);
        let amounts = manager.apply_payoff(&coalition.coalition_id, 10.0).unwrap();

        assert!((amounts[&a] - 8.0).abs() < 1e-9);
        assert!((amounts[&b] - 2.0).abs() < 1e-9);
        assert_eq!(ledger.xp(&a), 80);
        assert_eq!(ledger.xp(&b), 20);
    }

    #[test]
    fn test_empty_proposal_rejected() {
        let manager = CoalitionManager::new(ReputationLedger::new());
        let result = manager.propose(BTreeSet::new());
        assert!(matches!(result, Err(BazaarError::InvalidInput { .. })));
    }

    #[test]
    fn test_unrelated_coalitions_do_not_contend() {
        // Mutations on distinct coalitions interleave freely from many
        // threads; each entry stays internally consistent
        let ledger = ReputationLedger::new();
        let manager = CoalitionManager::new(ledger);

        let mut ids = Vec::new();
        for _ in 0..8 {
            ids.push(active_coalition(&manager, &[AgentId::new(), AgentId::new()]).coalition_id);
        }

        let mut handles = Vec::new();
        for id in &ids {
            let manager = manager.clone();
            let id = id.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..10 {
                    manager.refresh_split(&id).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        for id in &ids {
            assert!(manager.get(id).unwrap().split_is_consistent());
        }
    }
}
