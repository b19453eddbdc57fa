//! Agent archetypes
//!
//! Archetypes parameterize how an agent combines valuation terms. The
//! dispatch is a closed enum with one parameter table per variant rather
//! than open-ended string branching.

use serde::{Deserialize, Serialize};

/// Behavioral archetype of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Archetype {
    /// Risk-seeking: amplifies drift and strategy bonuses, shrugs at costs
    Visionary,
    /// Conservative: dampens drift, feels costs more strongly
    Investor,
    /// Balanced baseline behavior
    Default,
}

impl Default for Archetype {
    fn default() -> Self {
        Self::Default
    }
}

/// Valuation multipliers for one archetype
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeParams {
    /// Scales the combined positive terms for risk-seeking archetypes
    pub risk_multiplier: f64,
    /// Scales the strategy-module bonus
    pub bonus_multiplier: f64,
    /// Scales total transaction costs
    pub cost_sensitivity: f64,
    /// Scales the historical drift adjustment
    pub drift_weight: f64,
}

impl Archetype {
    /// Parameter table for this archetype
    pub fn params(&self) -> ArchetypeParams {
        match self {
            Archetype::Visionary => ArchetypeParams {
                risk_multiplier: 1.2,
                bonus_multiplier: 1.1,
                cost_sensitivity: 0.8,
                drift_weight: 1.3,
            },
            Archetype::Investor => ArchetypeParams {
                risk_multiplier: 0.8,
                bonus_multiplier: 0.9,
                cost_sensitivity: 1.2,
                drift_weight: 0.7,
            },
            Archetype::Default => ArchetypeParams {
                risk_multiplier: 1.0,
                bonus_multiplier: 1.0,
                cost_sensitivity: 1.0,
                drift_weight: 1.0,
            },
        }
    }
}
