//! Bazaar SDK - the operation surface for simulation drivers
//!
//! Wires the profile store, reputation ledger, appraisal engine,
//! negotiation protocol, coalition manager, and ownership chain into one
//! facade, and owns the settlement orchestration for accepted trades:
//! mint → reputation → coalition payoff → broadcast.
//!
//! Settlement touches one entity lock at a time, item before coalition;
//! no operation ever holds two locks.

pub mod builder;

pub use builder::BazaarBuilder;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use bazaar_appraisal::{Appraisal, AppraisalEngine};
use bazaar_coalition::CoalitionManager;
use bazaar_negotiation::NegotiationProtocol;
use bazaar_oracle::Broadcast;
use bazaar_provenance::OwnershipChain;
use bazaar_registry::ProfileStore;
use bazaar_reputation::ReputationLedger;
use bazaar_types::{
    AgentId, AgentProfile, BazaarError, Coalition, CoalitionId, CorrelationId, ItemId,
    ItemListing, NegotiationProposal, OwnerPrecondition, OwnershipRecord, Result, TradeContext,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Everything that happened in one trade attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeReport {
    pub proposal: NegotiationProposal,
    /// The new ownership record, when the trade was accepted
    pub minted: Option<OwnershipRecord>,
    /// Coalition payoff amounts, when the trade ran in a coalition context
    pub payoff: Option<BTreeMap<AgentId, f64>>,
}

/// The Bazaar facade
#[derive(Clone)]
pub struct Bazaar {
    profiles: ProfileStore,
    reputation: ReputationLedger,
    appraisal: AppraisalEngine,
    negotiation: NegotiationProtocol,
    coalitions: CoalitionManager,
    chain: OwnershipChain,
    broadcast: Arc<dyn Broadcast>,
}

impl Bazaar {
    pub fn builder() -> BazaarBuilder {
        BazaarBuilder::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        profiles: ProfileStore,
        reputation: ReputationLedger,
        appraisal: AppraisalEngine,
        negotiation: NegotiationProtocol,
        coalitions: CoalitionManager,
        chain: OwnershipChain,
        broadcast: Arc<dyn Broadcast>,
    ) -> Self {
        Self {
            profiles,
            reputation,
            appraisal,
            negotiation,
            coalitions,
            chain,
            broadcast,
        }
    }

    // ------------------------------------------------------------------
    // Agents
    // ------------------------------------------------------------------

    /// Register an agent profile
    pub async fn register_agent(&self, profile: AgentProfile) -> Result<()> {
        self.profiles.register(profile).await
    }

    /// Profile store handle, for self-modification calls
    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    /// Reputation ledger handle
    pub fn reputation(&self) -> &ReputationLedger {
        &self.reputation
    }

    /// Negotiation protocol handle, for abandon/expiry sweeps
    pub fn negotiation(&self) -> &NegotiationProtocol {
        &self.negotiation
    }

    // ------------------------------------------------------------------
    // Appraisal
    // ------------------------------------------------------------------

    /// Appraise an item for an agent, optionally against a counterpart
    pub async fn appraise_item(
        &self,
        item: &ItemListing,
        context: &TradeContext,
        appraiser_id: &AgentId,
        counterpart_id: Option<&AgentId>,
        enable_pitch: bool,
    ) -> Result<Appraisal> {
        let appraiser = self.profiles.require(appraiser_id).await?;
        let counterpart = match counterpart_id {
            Some(id) => Some(self.profiles.require(id).await?),
            None => None,
        };
        Ok(self
            .appraisal
            .appraise(item, context, &appraiser, counterpart.as_ref(), enable_pitch)
            .await)
    }

    // ------------------------------------------------------------------
    // Trades
    // ------------------------------------------------------------------

    /// Run a full trade: negotiate, then settle on acceptance
    ///
    /// On Accept: the item is minted to the target (with an
    /// expected-owner precondition when it is already owned), both
    /// parties' reputation settles, and — when the trade ran inside a
    /// coalition — the coalition's profit share is paid out. On Reject
    /// only the proposer's history records the failure.
    pub async fn negotiate_trade(
        &self,
        proposer_id: &AgentId,
        target_id: &AgentId,
        item: &ItemListing,
        context: &TradeContext,
        enable_pitch: bool,
        coalition_id: Option<&CoalitionId>,
    ) -> Result<TradeReport> {
        let outcome = self
            .negotiation
            .negotiate(proposer_id, target_id, item, context, enable_pitch)
            .await?;
        let proposal = outcome.proposal;

        if !proposal.accepted() {
            self.reputation.settle_reject(
                proposer_id,
                &item.item_id,
                &format!("trade rejected: {:?}", proposal.status),
            );
            self.sync_standing(proposer_id).await;
            return Ok(TradeReport {
                proposal,
                minted: None,
                payoff: None,
            });
        }

        // Item lock first: mint to the target, guarding against a
        // concurrent transfer of the same item
        let precondition = match self.chain.current_owner(&item.item_id) {
            None => OwnerPrecondition::Unowned,
            Some(owner) if owner == *proposer_id => OwnerPrecondition::Owner(owner),
            Some(owner) => {
                return Err(BazaarError::OwnershipConflict {
                    item_id: item.item_id.to_string(),
                    expected: proposer_id.to_string(),
                    actual: owner.to_string(),
                })
            }
        };
        let minted = self.chain.mint(
            &item.item_id,
            target_id,
            precondition,
            proposal.correlation_id.clone(),
        )?;

        self.reputation
            .settle_accept(proposer_id, target_id, &item.item_id);
        self.sync_standing(proposer_id).await;
        self.sync_standing(target_id).await;

        // Coalition lock second, only after the item lock is released
        let payoff = match (coalition_id, context.is_coalition()) {
            (Some(coalition_id), true) => {
                let share = self.appraisal.cost_schedule().coalition_profit_share;
                let total = item.market_value * share;
                Some(self.coalitions.apply_payoff(coalition_id, total)?)
            }
            _ => None,
        };

        self.publish_event(
            proposer_id,
            serde_json::json!({
                "event": "trade_settled",
                "item_id": item.item_id.to_string(),
                "new_owner": target_id.to_string(),
                "correlation_id": proposal.correlation_id.to_string(),
            }),
        )
        .await;

        info!(
            correlation_id = %proposal.correlation_id,
            item_id = %item.item_id,
            new_owner = %target_id,
            "trade settled"
        );

        Ok(TradeReport {
            proposal,
            minted: Some(minted),
            payoff,
        })
    }

    // ------------------------------------------------------------------
    // Coalitions
    // ------------------------------------------------------------------

    /// Propose a coalition over a set of agents
    pub async fn form_coalition(&self, members: BTreeSet<AgentId>) -> Result<Coalition> {
        for member in &members {
            self.profiles.require(member).await?;
        }
        let coalition = self.coalitions.propose(members)?;
        self.publish_event(
            coalition
                .members
                .iter()
                .next()
                .unwrap_or(&AgentId::default()),
            serde_json::json!({
                "event": "coalition_proposed",
                "coalition_id": coalition.coalition_id.to_string(),
                "members": coalition.members.len(),
            }),
        )
        .await;
        Ok(coalition)
    }

    /// Record a member's acceptance of a proposed coalition
    pub fn accept_coalition(
        &self,
        coalition_id: &CoalitionId,
        member_id: &AgentId,
    ) -> Result<Coalition> {
        self.coalitions.accept(coalition_id, member_id)
    }

    /// Merge one coalition into another
    pub fn merge_coalitions(
        &self,
        target_id: &CoalitionId,
        source_id: &CoalitionId,
    ) -> Result<Coalition> {
        self.coalitions.merge(target_id, source_id)
    }

    /// Dissolve a coalition
    pub fn dissolve_coalition(&self, coalition_id: &CoalitionId) -> Result<()> {
        self.coalitions.dissolve(coalition_id)
    }

    /// Current payoff split of an active coalition
    pub fn coalition_split(&self, coalition_id: &CoalitionId) -> Result<BTreeMap<AgentId, f64>> {
        self.coalitions.split(coalition_id)
    }

    // ------------------------------------------------------------------
    // Ownership
    // ------------------------------------------------------------------

    /// Mint an ownership record directly (e.g. genesis assignment)
    pub fn mint_ownership_record(
        &self,
        item_id: &ItemId,
        owner_id: &AgentId,
        precondition: OwnerPrecondition,
    ) -> Result<OwnershipRecord> {
        self.chain
            .mint(item_id, owner_id, precondition, CorrelationId::new())
    }

    /// Current owner of an item
    pub fn current_owner(&self, item_id: &ItemId) -> Option<AgentId> {
        self.chain.current_owner(item_id)
    }

    /// Full provenance chain for an item, oldest first
    pub fn provenance(&self, item_id: &ItemId) -> Vec<OwnershipRecord> {
        self.chain.provenance(item_id)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn sync_standing(&self, agent_id: &AgentId) {
        let (reputation, xp) = self.reputation.standing(agent_id);
        self.profiles.sync_standing(agent_id, reputation, xp).await;
    }

    async fn publish_event(&self, agent_id: &AgentId, payload: serde_json::Value) {
        let visibility = self
            .profiles
            .get(agent_id)
            .await
            .map(|profile| profile.visibility)
            .unwrap_or_default();
        if let Err(err) = self
            .broadcast
            .publish(&agent_id.to_string(), &payload.to_string(), &visibility)
            .await
        {
            warn!(agent_id = %agent_id, error = %err, "broadcast failed, continuing");
        }
    }
}
