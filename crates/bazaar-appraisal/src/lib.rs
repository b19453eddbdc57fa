//! Bazaar Appraisal Engine
//!
//! Computes an archetype-sensitive subjective value and cost estimate for
//! an item. Every term lands in a structured breakdown for auditability,
//! and collaborator failures degrade to heuristics instead of erroring:
//! `appraise` never fails.

pub mod alignment;
pub mod costs;

pub use alignment::alignment_score;
pub use costs::{CostBreakdown, CostSchedule};

use std::sync::Arc;

use bazaar_oracle::{StrategyModule, ValuationOracle};
use bazaar_reputation::{ReputationLedger, NEUTRAL_BASELINE};
use bazaar_types::{AgentProfile, Archetype, CorrelationId, ItemListing, TradeContext};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Multiplier applied to the declared market value when the oracle is down
pub const FALLBACK_VALUE_FACTOR: f64 = 0.5;

/// Scale of the historical drift term relative to market value
pub const DRIFT_SCALE: f64 = 0.2;

/// Default weight of the alignment term relative to market value
pub const DEFAULT_ALIGNMENT_WEIGHT: f64 = 0.1;

/// Full audit trail of one appraisal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppraisalBreakdown {
    pub correlation_id: CorrelationId,
    pub archetype: Archetype,
    pub context: String,
    /// Oracle score, or the heuristic fallback when degraded
    pub base_value: f64,
    pub drift: f64,
    /// Raw similarity between the two agents' value maps, in [0, 1]
    pub alignment_score: f64,
    /// Alignment scaled into value units
    pub alignment_term: f64,
    /// Archetype-scaled strategy bonus
    pub strategic_bonus: f64,
    pub costs: CostBreakdown,
    /// True when any collaborator was unavailable and a fallback was used
    pub degraded: bool,
}

/// Result of one appraisal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appraisal {
    /// Final subjective net value
    pub value: f64,
    /// Sensitivity-adjusted total fiat cost
    pub cost: f64,
    pub breakdown: AppraisalBreakdown,
}

/// The appraisal engine
///
/// Reads reputation history; writes nothing.
#[derive(Clone)]
pub struct AppraisalEngine {
    oracle: Arc<dyn ValuationOracle>,
    strategy: Arc<dyn StrategyModule>,
    reputation: ReputationLedger,
    costs: CostSchedule,
    alignment_weight: f64,
}

impl AppraisalEngine {
    pub fn new(
        oracle: Arc<dyn ValuationOracle>,
        strategy: Arc<dyn StrategyModule>,
        reputation: ReputationLedger,
        costs: CostSchedule,
    ) -> Self {
        Self {
            oracle,
            strategy,
            reputation,
            costs,
            alignment_weight: DEFAULT_ALIGNMENT_WEIGHT,
        }
    }

    pub fn with_alignment_weight(mut self, weight: f64) -> Self {
        self.alignment_weight = weight;
        self
    }

    pub fn cost_schedule(&self) -> &CostSchedule {
        &self.costs
    }

    /// Appraise an item for an agent, optionally against a counterpart
    ///
    /// Steps: oracle base value (heuristic fallback on unavailability),
    /// history drift, value-map alignment, archetype-scaled strategy
    /// bonus, sensitivity-adjusted costs, then the archetype's
    /// combination formula.
    pub async fn appraise(
        &self,
        item: &ItemListing,
        context: &TradeContext,
        appraiser: &AgentProfile,
        counterpart: Option<&AgentProfile>,
        enable_pitch: bool,
    ) -> Appraisal {
        let correlation_id = CorrelationId::new();
        let params = appraiser.archetype.params();
        let mut degraded = false;

        // Step 1: base value, falling back to a conservative heuristic
        let base_value = match self.oracle.score(item, context).await {
            Ok(score) => score,
            Err(err) => {
                degraded = true;
                warn!(
                    correlation_id = %correlation_id,
                    item_id = %item.item_id,
                    error = %err,
                    "valuation oracle unavailable, using heuristic fallback"
                );
                item.market_value * FALLBACK_VALUE_FACTOR
            }
        };

        // Step 2: drift from historical outcomes, reputation-weighted
        let success_rate = self.reputation.success_rate(&appraiser.agent_id);
        let reputation = self.reputation.reputation(&appraiser.agent_id);
        let drift = (success_rate - NEUTRAL_BASELINE)
            * reputation
            * params.drift_weight
            * item.market_value
            * DRIFT_SCALE;

        // Step 3: alignment with the counterpart's value map
        let alignment = alignment_score(appraiser, counterpart, &correlation_id);
        let alignment_term = alignment * item.market_value * self.alignment_weight;

        // Step 4: strategy bonus, archetype-scaled, never negative
        let strategic_bonus = match self.strategy.bonus(item, appraiser, counterpart).await {
            Ok(bonus) => bonus.max(0.0) * params.bonus_multiplier,
            Err(err) => {
                degraded = true;
                warn!(
                    correlation_id = %correlation_id,
                    error = %err,
                    "strategy module unavailable, bonus defaults to zero"
                );
                0.0
            }
        };

        // Step 5: costs with archetype sensitivity
        let costs = self.costs.estimate(
            item.market_value,
            context,
            enable_pitch,
            appraiser.xp,
            params.cost_sensitivity,
        );
        let cost = costs.total_adjusted;

        // Step 6: archetype combination formula
        let value = match appraiser.archetype {
            Archetype::Visionary => {
                (base_value + drift + alignment_term + strategic_bonus) * params.risk_multiplier
                    - cost
            }
            Archetype::Investor => {
                (base_value + drift + alignment_term - cost) * (1.0 + strategic_bonus * 0.1)
            }
            Archetype::Default => base_value + drift + alignment_term + strategic_bonus - cost,
        };

        debug!(
            correlation_id = %correlation_id,
            item_id = %item.item_id,
            agent_id = %appraiser.agent_id,
            archetype = ?appraiser.archetype,
            base_value,
            drift,
            alignment,
            strategic_bonus,
            cost,
            value,
            degraded,
            "item appraised"
        );

        Appraisal {
            value,
            cost,
            breakdown: AppraisalBreakdown {
                correlation_id,
                archetype: appraiser.archetype,
                context: context.label().to_string(),
                base_value,
                drift,
                alignment_score: alignment,
                alignment_term,
                strategic_bonus,
                costs,
                degraded,
            },
        }
    }
}
