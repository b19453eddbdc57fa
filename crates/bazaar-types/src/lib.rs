//! Bazaar Types - Canonical domain types for the agent economy
//!
//! This crate contains all foundational types for Bazaar with zero
//! dependencies on other bazaar crates. It defines the complete type system
//! for:
//!
//! - Identity types (AgentId, ItemId, CoalitionId, etc.)
//! - Agent profiles and archetypes
//! - Trade records and ownership records
//! - Negotiation proposals and coalitions
//!
//! # Architectural Invariants
//!
//! These types support the core Bazaar consistency invariants:
//!
//! 1. Exactly one current owner per item at any time
//! 2. Coalition payoff shares sum to 1.0 within tolerance
//! 3. Reputation stays in [0, 1] after any update sequence
//! 4. Terminal states (Rejected, Accepted, Dissolved) are immutable

pub mod archetype;
pub mod coalition;
pub mod error;
pub mod identity;
pub mod item;
pub mod ownership;
pub mod profile;
pub mod proposal;
pub mod trade;

pub use archetype::*;
pub use coalition::*;
pub use error::*;
pub use identity::*;
pub use item::*;
pub use ownership::*;
pub use profile::*;
pub use proposal::*;
pub use trade::*;

/// Version of the Bazaar types schema
pub const TYPES_VERSION: &str = "0.1.0";

/// Tolerance used when checking that coalition payoff shares sum to 1.0
pub const SPLIT_TOLERANCE: f64 = 1e-6;

/// Floor applied to a zero-reputation member before a split is renormalized
pub const REPUTATION_SPLIT_FLOOR: f64 = 0.01;
