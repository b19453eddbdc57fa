//! Transaction cost estimation

use bazaar_types::TradeContext;
use serde::{Deserialize, Serialize};

/// Fee schedule for appraisals and trades
///
/// Defaults mirror the simulated network's microtransaction pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostSchedule {
    /// Flat network (gas-equivalent) fee per trade
    pub network_fee: f64,
    /// Flat protocol micropayment fee per trade
    pub protocol_fee: f64,
    /// XP price of a pitch when the agent can pay in XP
    pub pitch_cost_xp: u64,
    /// Fiat price of a pitch otherwise
    pub pitch_cost_fiat: f64,
    /// XP balance at which pitches are paid in XP instead of fiat
    pub pitch_xp_threshold: u64,
    /// Fraction of market value owed to the coalition on coalition trades
    pub coalition_profit_share: f64,
}

impl Default for CostSchedule {
    fn default() -> Self {
        Self {
            network_fee: 0.0001,
            protocol_fee: 0.001,
            pitch_cost_xp: 5,
            pitch_cost_fiat: 0.01,
            pitch_xp_threshold: 10,
            coalition_profit_share: 0.05,
        }
    }
}

/// Itemized costs for one appraisal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub network_fee: f64,
    pub protocol_fee: f64,
    /// Fiat pitch cost; zero when the pitch is disabled or paid in XP
    pub pitch_fiat: f64,
    /// XP pitch cost; zero when the pitch is disabled or paid in fiat
    pub pitch_xp: u64,
    /// Coalition profit share in value units
    pub coalition_share: f64,
    /// Sum of fiat costs before archetype sensitivity
    pub total_fiat: f64,
    /// Fiat total scaled by the archetype's cost sensitivity
    pub total_adjusted: f64,
}

impl CostSchedule {
    /// Whether the agent's XP covers a pitch in XP
    pub fn pitch_paid_in_xp(&self, xp: u64) -> bool {
        xp >= self.pitch_xp_threshold
    }

    /// Estimate all costs for one prospective trade
    pub fn estimate(
        &self,
        market_value: f64,
        context: &TradeContext,
        enable_pitch: bool,
        appraiser_xp: u64,
        cost_sensitivity: f64,
    ) -> CostBreakdown {
        let mut pitch_fiat = 0.0;
        let mut pitch_xp = 0;
        if enable_pitch {
            if self.pitch_paid_in_xp(appraiser_xp) {
                pitch_xp = self.pitch_cost_xp;
            } else {
                pitch_fiat = self.pitch_cost_fiat;
            }
        }

        let coalition_share = if context.is_coalition() {
            market_value * self.coalition_profit_share
        } else {
            0.0
        };

        let total_fiat = self.network_fee + self.protocol_fee + pitch_fiat + coalition_share;

        CostBreakdown {
            network_fee: self.network_fee,
            protocol_fee: self.protocol_fee,
            pitch_fiat,
            pitch_xp,
            coalition_share,
            total_fiat,
            total_adjusted: total_fiat * cost_sensitivity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_paid_in_xp_above_threshold() {
        let schedule = CostSchedule::default();
        let costs = schedule.estimate(100.0, &TradeContext::Trade, true, 50, 1.0);
        assert_eq!(costs.pitch_xp, schedule.pitch_cost_xp);
        assert_eq!(costs.pitch_fiat, 0.0);
    }

    #[test]
    fn test_pitch_paid_in_fiat_below_threshold() {
        let schedule = CostSchedule::default();
        let costs = schedule.estimate(100.0, &TradeContext::Trade, true, 0, 1.0);
        assert_eq!(costs.pitch_xp, 0);
        assert!((costs.pitch_fiat - schedule.pitch_cost_fiat).abs() < 1e-12);
    }

    #[test]
    fn test_coalition_share_scales_with_value() {
        let schedule = CostSchedule::default();
        let costs = schedule.estimate(200.0, &TradeContext::Coalition, false, 0, 1.0);
        assert!((costs.coalition_share - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_sensitivity_scales_total() {
        let schedule = CostSchedule::default();
        let base = schedule.estimate(100.0, &TradeContext::Trade, false, 0, 1.0);
        let sensitive = schedule.estimate(100.0, &TradeContext::Trade, false, 0, 1.2);
        assert!((sensitive.total_adjusted - base.total_fiat * 1.2).abs() < 1e-12);
    }
}
