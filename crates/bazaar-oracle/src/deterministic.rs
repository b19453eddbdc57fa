//! Deterministic collaborator implementations
//!
//! These keep simulations runnable with no LLM or network in the loop and
//! give tests exact control over collaborator behavior.

use crate::{
    Broadcast, OracleError, OracleResult, PitchGenerator, StrategyModule, ValuationOracle,
};
use async_trait::async_trait;
use bazaar_types::{AgentProfile, ItemListing, TradeContext, VisibilityPrefs};
use tracing::info;

/// Oracle that returns a fixed fraction of the declared market value
pub struct StaticOracle {
    /// Multiplier applied to the item's declared market value
    pub factor: f64,
}

impl StaticOracle {
    pub fn new(factor: f64) -> Self {
        Self { factor }
    }
}

impl Default for StaticOracle {
    fn default() -> Self {
        // Treat the declared market value as the subjective score
        Self { factor: 1.0 }
    }
}

#[async_trait]
impl ValuationOracle for StaticOracle {
    async fn score(&self, item: &ItemListing, _context: &TradeContext) -> OracleResult<f64> {
        Ok(item.market_value * self.factor)
    }
}

/// Oracle that is always down; exercises the heuristic fallback path
#[derive(Default)]
pub struct OfflineOracle;

#[async_trait]
impl ValuationOracle for OfflineOracle {
    async fn score(&self, _item: &ItemListing, _context: &TradeContext) -> OracleResult<f64> {
        Err(OracleError::unavailable("oracle offline"))
    }
}

/// Template-based pitch generator, the fallback when no live generator is
/// wired in
#[derive(Default)]
pub struct TemplatePitcher;

#[async_trait]
impl PitchGenerator for TemplatePitcher {
    async fn generate(
        &self,
        proposer: &AgentProfile,
        target: &AgentProfile,
        item: &ItemListing,
    ) -> OracleResult<String> {
        Ok(format!(
            "{} would advance your goal of \"{}\", and trading it furthers mine: {}.",
            item.name, target.goal, proposer.goal
        ))
    }
}

/// Pitch generator that is always down
#[derive(Default)]
pub struct OfflinePitcher;

#[async_trait]
impl PitchGenerator for OfflinePitcher {
    async fn generate(
        &self,
        _proposer: &AgentProfile,
        _target: &AgentProfile,
        _item: &ItemListing,
    ) -> OracleResult<String> {
        Err(OracleError::unavailable("pitch generator offline"))
    }
}

/// Posture a strategy evaluation can take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyPosture {
    Cooperative,
    Competitive,
    Neutral,
    Aggressive,
}

impl StrategyPosture {
    fn bonus(&self) -> f64 {
        match self {
            StrategyPosture::Cooperative => 5.0,
            StrategyPosture::Competitive => 3.0,
            StrategyPosture::Neutral => 0.0,
            StrategyPosture::Aggressive => -2.0,
        }
    }
}

/// Deterministic strategy module: confidence-scaled base plus a
/// posture-keyed bonus, floored at zero
pub struct CoordinationStrategy {
    pub confidence: f64,
    pub posture: StrategyPosture,
}

impl CoordinationStrategy {
    pub fn new(confidence: f64, posture: StrategyPosture) -> Self {
        Self { confidence, posture }
    }
}

impl Default for CoordinationStrategy {
    fn default() -> Self {
        Self {
            confidence: 0.5,
            posture: StrategyPosture::Neutral,
        }
    }
}

#[async_trait]
impl StrategyModule for CoordinationStrategy {
    async fn bonus(
        &self,
        _item: &ItemListing,
        _proposer: &AgentProfile,
        _target: Option<&AgentProfile>,
    ) -> OracleResult<f64> {
        let raw = self.confidence * 10.0 + self.posture.bonus();
        Ok(raw.max(0.0))
    }
}

/// Strategy module that is always down
#[derive(Default)]
pub struct OfflineStrategy;

#[async_trait]
impl StrategyModule for OfflineStrategy {
    async fn bonus(
        &self,
        _item: &ItemListing,
        _proposer: &AgentProfile,
        _target: Option<&AgentProfile>,
    ) -> OracleResult<f64> {
        Err(OracleError::unavailable("strategy module offline"))
    }
}

/// Broadcast that only writes to the log
#[derive(Default)]
pub struct LogBroadcast;

#[async_trait]
impl Broadcast for LogBroadcast {
    async fn publish(
        &self,
        agent_id: &str,
        message: &str,
        visibility: &VisibilityPrefs,
    ) -> OracleResult<()> {
        info!(
            agent_id,
            message,
            public_snippet = visibility.show_public_snippet,
            "broadcast"
        );
        Ok(())
    }
}
