//! Bazaar Oracle - External collaborator contracts
//!
//! The core engine depends on five external collaborators but implements
//! none of them: a valuation oracle, a persuasion pitch generator, a
//! game-theoretic strategy module, a payment service, and a broadcast
//! channel. Each is an async trait with an explicit `Unavailable` error
//! variant; unavailability is a value, never a panic.
//!
//! Deterministic in-process implementations live here too so tests and
//! offline simulations run without any network dependency.

pub mod deterministic;
pub mod payments;

pub use deterministic::*;
pub use payments::*;

use async_trait::async_trait;
use bazaar_types::{AgentProfile, ItemListing, TradeContext, VisibilityPrefs};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Collaborator failure modes
#[derive(Debug, Clone, Error)]
pub enum OracleError {
    /// The collaborator is unreachable or declined to answer
    #[error("Collaborator unavailable: {reason}")]
    Unavailable { reason: String },

    /// The payer cannot cover the requested amount
    #[error("Payment failed: requested {requested}, available {available}")]
    PaymentFailed { requested: f64, available: f64 },

    /// The collaborator answered with something unusable
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },
}

impl OracleError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

pub type OracleResult<T> = std::result::Result<T, OracleError>;

/// Scores an item's subjective value for a given context
#[async_trait]
pub trait ValuationOracle: Send + Sync {
    async fn score(&self, item: &ItemListing, context: &TradeContext) -> OracleResult<f64>;
}

/// Generates a persuasion pitch from proposer to target
#[async_trait]
pub trait PitchGenerator: Send + Sync {
    async fn generate(
        &self,
        proposer: &AgentProfile,
        target: &AgentProfile,
        item: &ItemListing,
    ) -> OracleResult<String>;
}

/// Game-theoretic evaluator returning a non-negative competitive bonus
#[async_trait]
pub trait StrategyModule: Send + Sync {
    async fn bonus(
        &self,
        item: &ItemListing,
        proposer: &AgentProfile,
        target: Option<&AgentProfile>,
    ) -> OracleResult<f64>;
}

/// Receipt returned by a successful payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub receipt_id: String,
    pub payer_wallet: String,
    pub amount: f64,
}

/// Executes fiat-equivalent micropayments against an agent's wallet
#[async_trait]
pub trait PaymentService: Send + Sync {
    async fn pay(&self, amount: f64, payer_wallet: &str) -> OracleResult<Receipt>;
}

/// Publishes trade and coalition events to the outside world
///
/// The publishing agent's visibility preferences ride along with each
/// event; the reciprocal-sharing check lives in the implementation, not
/// the core.
#[async_trait]
pub trait Broadcast: Send + Sync {
    async fn publish(
        &self,
        agent_id: &str,
        message: &str,
        visibility: &VisibilityPrefs,
    ) -> OracleResult<()>;
}
