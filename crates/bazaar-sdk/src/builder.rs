//! Builder for the Bazaar facade
//!
//! Defaults to the deterministic in-process collaborators so a facade is
//! usable offline; drivers swap in live oracle/pitch/payment adapters.

use std::sync::Arc;

use bazaar_appraisal::{AppraisalEngine, CostSchedule};
use bazaar_coalition::CoalitionManager;
use bazaar_negotiation::{
    DecisionSampler, NegotiationConfig, NegotiationProtocol, RandomSampler,
};
use bazaar_oracle::{
    Broadcast, CoordinationStrategy, InMemoryPayments, LogBroadcast, PaymentService,
    PitchGenerator, StaticOracle, StrategyModule, TemplatePitcher, ValuationOracle,
};
use bazaar_provenance::OwnershipChain;
use bazaar_registry::ProfileStore;
use bazaar_reputation::ReputationLedger;

use crate::Bazaar;

/// Builder for [`Bazaar`]
pub struct BazaarBuilder {
    oracle: Arc<dyn ValuationOracle>,
    strategy: Arc<dyn StrategyModule>,
    pitcher: Arc<dyn PitchGenerator>,
    payments: Arc<dyn PaymentService>,
    broadcast: Arc<dyn Broadcast>,
    sampler: Arc<dyn DecisionSampler>,
    costs: CostSchedule,
    negotiation: NegotiationConfig,
}

impl Default for BazaarBuilder {
    fn default() -> Self {
        Self {
            oracle: Arc::new(StaticOracle::default()),
            strategy: Arc::new(CoordinationStrategy::default()),
            pitcher: Arc::new(TemplatePitcher),
            payments: Arc::new(InMemoryPayments::new()),
            broadcast: Arc::new(LogBroadcast),
            sampler: Arc::new(RandomSampler),
            costs: CostSchedule::default(),
            negotiation: NegotiationConfig::default(),
        }
    }
}

impl BazaarBuilder {
    pub fn oracle(mut self, oracle: Arc<dyn ValuationOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn strategy(mut self, strategy: Arc<dyn StrategyModule>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn pitcher(mut self, pitcher: Arc<dyn PitchGenerator>) -> Self {
        self.pitcher = pitcher;
        self
    }

    pub fn payments(mut self, payments: Arc<dyn PaymentService>) -> Self {
        self.payments = payments;
        self
    }

    pub fn broadcast(mut self, broadcast: Arc<dyn Broadcast>) -> Self {
        self.broadcast = broadcast;
        self
    }

    pub fn sampler(mut self, sampler: Arc<dyn DecisionSampler>) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn cost_schedule(mut self, costs: CostSchedule) -> Self {
        self.costs = costs;
        self
    }

    pub fn negotiation_config(mut self, config: NegotiationConfig) -> Self {
        self.negotiation = config;
        self
    }

    pub fn build(self) -> Bazaar {
        let profiles = ProfileStore::new();
        let reputation = ReputationLedger::new();

        let appraisal = AppraisalEngine::new(
            self.oracle,
            self.strategy,
            reputation.clone(),
            self.costs,
        );
        let negotiation = NegotiationProtocol::new(
            appraisal.clone(),
            self.pitcher,
            self.payments,
            reputation.clone(),
            profiles.clone(),
            self.sampler,
            self.negotiation,
        );
        let coalitions = CoalitionManager::new(reputation.clone());
        let chain = OwnershipChain::new();

        Bazaar::assemble(
            profiles,
            reputation,
            appraisal,
            negotiation,
            coalitions,
            chain,
            self.broadcast,
        )
    }
}
