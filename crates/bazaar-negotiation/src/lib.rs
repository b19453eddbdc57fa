//! Bazaar Negotiation Protocol
//!
//! Orchestrates a proposal between two agents: the proposer appraises,
//! optionally buys a persuasion pitch, the target appraises independently,
//! and an acceptance probability decides the outcome.
//!
//! State machine: `Proposed → (PitchGenerated)? → Evaluated →
//! {Accepted | Rejected}`; terminal states are immutable. Every proposal
//! is logged with its correlation id regardless of outcome. Settlement
//! (ownership mint, reputation updates) belongs to the caller.

pub mod sampler;

pub use sampler::{DecisionSampler, FixedSampler, RandomSampler};

use std::sync::Arc;

use bazaar_appraisal::{Appraisal, AppraisalEngine};
use bazaar_oracle::{PaymentService, PitchGenerator, TemplatePitcher};
use bazaar_registry::ProfileStore;
use bazaar_reputation::ReputationLedger;
use bazaar_types::{
    AgentId, AgentProfile, BazaarError, CorrelationId, ItemListing, NegotiationProposal,
    ProposalId, ProposalStatus, RejectReason, Result, TradeContext,
};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::{debug, info, warn};

/// Weight of alignment in the acceptance probability
const WEIGHT_ALIGNMENT: f64 = 0.6;
/// Weight of the target's normalized appraisal quality
const WEIGHT_QUALITY: f64 = 0.3;
/// Weight of a pitch being present
const WEIGHT_PITCH: f64 = 0.1;

/// Protocol configuration
#[derive(Debug, Clone)]
pub struct NegotiationConfig {
    /// Proposer walks away when its own appraisal falls below this
    pub acceptance_floor: f64,
    /// Non-terminal proposals older than this are swept to Expired
    pub proposal_ttl: Duration,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            acceptance_floor: 0.0,
            proposal_ttl: Duration::seconds(300),
        }
    }
}

/// Acceptance probability from its three signals, clipped to [0, 1]
///
/// Monotone non-decreasing in each signal.
pub fn acceptance_probability(alignment: f64, appraisal_quality: f64, pitch_present: bool) -> f64 {
    let p = WEIGHT_ALIGNMENT * alignment
        + WEIGHT_QUALITY * appraisal_quality
        + WEIGHT_PITCH * if pitch_present { 1.0 } else { 0.0 };
    // The weights sum to 1.0 only up to f64 rounding; snap so a
    // maximal-signal proposal cannot lose the draw in the last ulp
    if (1.0 - p).abs() < 1e-12 {
        return 1.0;
    }
    p.clamp(0.0, 1.0)
}

/// The outcome of a full negotiation run
#[derive(Debug, Clone)]
pub struct NegotiationOutcome {
    pub proposal: NegotiationProposal,
    /// The proposer's own appraisal
    pub proposer_appraisal: Appraisal,
    /// The target's appraisal; absent when the proposer walked away early
    pub target_appraisal: Option<Appraisal>,
}

/// The negotiation protocol engine
#[derive(Clone)]
pub struct NegotiationProtocol {
    appraisal: AppraisalEngine,
    pitcher: Arc<dyn PitchGenerator>,
    payments: Arc<dyn PaymentService>,
    reputation: ReputationLedger,
    profiles: ProfileStore,
    sampler: Arc<dyn DecisionSampler>,
    config: NegotiationConfig,
    /// All proposals ever made, terminal or not
    proposals: Arc<DashMap<ProposalId, NegotiationProposal>>,
    /// Proposals that actually reached each target agent
    delivered: Arc<DashMap<AgentId, Vec<ProposalId>>>,
}

impl NegotiationProtocol {
    pub fn new(
        appraisal: AppraisalEngine,
        pitcher: Arc<dyn PitchGenerator>,
        payments: Arc<dyn PaymentService>,
        reputation: ReputationLedger,
        profiles: ProfileStore,
        sampler: Arc<dyn DecisionSampler>,
        config: NegotiationConfig,
    ) -> Self {
        Self {
            appraisal,
            pitcher,
            payments,
            reputation,
            profiles,
            sampler,
            config,
            proposals: Arc::new(DashMap::new()),
            delivered: Arc::new(DashMap::new()),
        }
    }

    /// Run a full negotiation between two agents over an item
    pub async fn negotiate(
        &self,
        proposer_id: &AgentId,
        target_id: &AgentId,
        item: &ItemListing,
        context: &TradeContext,
        enable_pitch: bool,
    ) -> Result<NegotiationOutcome> {
        let proposer = self.profiles.require(proposer_id).await?;
        let target = self.profiles.require(target_id).await?;

        let proposal_id = ProposalId::new();
        let mut proposal = NegotiationProposal {
            proposal_id: proposal_id.clone(),
            proposer: proposer_id.clone(),
            target: target_id.clone(),
            item_id: item.item_id.clone(),
            pitch: None,
            alignment_score: 0.0,
            acceptance_probability: 0.0,
            status: ProposalStatus::Proposed,
            correlation_id: CorrelationId::new(),
            created_at: Utc::now(),
        };
        self.proposals
            .insert(proposal_id.clone(), proposal.clone());

        // Step 1: the proposer appraises its own offer
        let proposer_appraisal = self
            .appraisal
            .appraise(item, context, &proposer, Some(&target), enable_pitch)
            .await;

        if proposer_appraisal.value < self.config.acceptance_floor {
            // Initiator would not accept its own offer; the target never
            // sees this proposal
            info!(
                proposal_id = %proposal_id,
                correlation_id = %proposal.correlation_id,
                value = proposer_appraisal.value,
                floor = self.config.acceptance_floor,
                "proposer below own acceptance floor, walking away"
            );
            proposal.status = ProposalStatus::Rejected {
                reason: RejectReason::BelowFloor,
            };
            self.commit(&mut proposal);
            return Ok(NegotiationOutcome {
                proposal,
                proposer_appraisal,
                target_appraisal: None,
            });
        }

        // Step 2: optional persuasion pitch
        if enable_pitch {
            proposal.pitch = self
                .acquire_pitch(&proposer, &target, item, &proposal.correlation_id)
                .await;
            if proposal.pitch.is_some() {
                proposal.status = ProposalStatus::PitchGenerated;
            }
            // Committed through the terminal guard: an abandon that landed
            // while the pitch was in flight wins, and the negotiation stops
            self.commit(&mut proposal);
            if proposal.status.is_terminal() {
                return Ok(NegotiationOutcome {
                    proposal,
                    proposer_appraisal,
                    target_appraisal: None,
                });
            }
        }

        // Step 3: the target appraises independently
        let target_appraisal = self
            .appraisal
            .appraise(item, context, &target, Some(&proposer), false)
            .await;
        proposal.status = ProposalStatus::Evaluated;
        proposal.alignment_score = target_appraisal.breakdown.alignment_score;

        self.delivered
            .entry(target_id.clone())
            .or_default()
            .push(proposal_id.clone());

        // Step 4: acceptance probability
        let quality = if item.market_value > 0.0 {
            (target_appraisal.value / item.market_value).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let p = acceptance_probability(
            proposal.alignment_score,
            quality,
            proposal.pitch.is_some(),
        );
        proposal.acceptance_probability = p;

        // Step 5: the draw; a draw landing exactly on p rejects
        let draw = self.sampler.draw();
        let accepted = draw < p;
        proposal.status = if accepted {
            ProposalStatus::Accepted
        } else {
            ProposalStatus::Rejected {
                reason: RejectReason::Declined,
            }
        };

        info!(
            proposal_id = %proposal_id,
            correlation_id = %proposal.correlation_id,
            proposer = %proposer_id,
            target = %target_id,
            item_id = %item.item_id,
            alignment = proposal.alignment_score,
            quality,
            pitch = proposal.pitch.is_some(),
            probability = p,
            draw,
            accepted,
            "negotiation resolved"
        );

        self.commit(&mut proposal);
        Ok(NegotiationOutcome {
            proposal,
            proposer_appraisal,
            target_appraisal: Some(target_appraisal),
        })
    }

    /// Buy and generate a pitch; every failure path degrades to either a
    /// template pitch or no pitch at all, never an error
    async fn acquire_pitch(
        &self,
        proposer: &AgentProfile,
        target: &AgentProfile,
        item: &ItemListing,
        correlation_id: &CorrelationId,
    ) -> Option<String> {
        let schedule = self.appraisal.cost_schedule();
        let xp = self.reputation.xp(&proposer.agent_id);

        let paid = if schedule.pitch_paid_in_xp(xp) {
            self.reputation
                .spend_xp(&proposer.agent_id, schedule.pitch_cost_xp)
                .is_ok()
        } else {
            match self
                .payments
                .pay(schedule.pitch_cost_fiat, &proposer.wallet_ref)
                .await
            {
                Ok(_) => true,
                Err(err) => {
                    warn!(
                        correlation_id = %correlation_id,
                        agent_id = %proposer.agent_id,
                        error = %err,
                        "pitch payment failed, proceeding without pitch"
                    );
                    false
                }
            }
        };
        if !paid {
            return None;
        }

        match self.pitcher.generate(proposer, target, item).await {
            Ok(pitch) => Some(pitch),
            Err(err) => {
                debug!(
                    correlation_id = %correlation_id,
                    error = %err,
                    "pitch generator unavailable, falling back to template"
                );
                TemplatePitcher.generate(proposer, target, item).await.ok()
            }
        }
    }

    /// Write a proposal's final state into the log, refusing to overwrite
    /// a proposal another path already made terminal (e.g. abandon)
    fn commit(&self, proposal: &mut NegotiationProposal) {
        let mut entry = self
            .proposals
            .entry(proposal.proposal_id.clone())
            .or_insert_with(|| proposal.clone());
        if entry.status.is_terminal() && entry.status != proposal.status {
            *proposal = entry.clone();
        } else {
            *entry = proposal.clone();
        }
    }

    /// Mark a non-terminal proposal as abandoned
    pub fn abandon(&self, proposal_id: &ProposalId) -> Result<NegotiationProposal> {
        let mut entry =
            self.proposals
                .get_mut(proposal_id)
                .ok_or_else(|| BazaarError::ProposalNotFound {
                    proposal_id: proposal_id.to_string(),
                })?;
        if entry.status.is_terminal() {
            return Err(BazaarError::ProposalAlreadyTerminal {
                proposal_id: proposal_id.to_string(),
                status: format!("{:?}", entry.status),
            });
        }
        entry.status = ProposalStatus::Rejected {
            reason: RejectReason::Abandoned,
        };
        info!(proposal_id = %proposal_id, "proposal abandoned");
        Ok(entry.clone())
    }

    /// Sweep non-terminal proposals older than the TTL to Expired
    ///
    /// The simulation driver owns time and calls this explicitly; there is
    /// no background task. Returns the number of proposals expired.
    pub fn expire_stale(&self, now: DateTime<Utc>) -> usize {
        let mut expired = 0;
        for mut entry in self.proposals.iter_mut() {
            if !entry.status.is_terminal() && now - entry.created_at > self.config.proposal_ttl {
                entry.status = ProposalStatus::Rejected {
                    reason: RejectReason::Expired,
                };
                expired += 1;
            }
        }
        if expired > 0 {
            info!(expired, "stale proposals expired");
        }
        expired
    }

    /// Look up a proposal
    pub fn proposal(&self, proposal_id: &ProposalId) -> Option<NegotiationProposal> {
        self.proposals.get(proposal_id).map(|p| p.clone())
    }

    /// Proposals that actually reached a target (below-floor walkaways
    /// never appear here)
    pub fn delivered_to(&self, target_id: &AgentId) -> Vec<ProposalId> {
        self.delivered
            .get(target_id)
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}
