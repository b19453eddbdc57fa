//! Error types for Bazaar
//!
//! Transient collaborator failures are absorbed locally into degraded
//! results; only state-consistency violations surface through these
//! variants.

use thiserror::Error;

/// Result type for Bazaar operations
pub type Result<T> = std::result::Result<T, BazaarError>;

/// Bazaar error types
#[derive(Debug, Clone, Error)]
pub enum BazaarError {
    // ========================================================================
    // Collaborator Errors
    // ========================================================================

    /// Valuation oracle unavailable; callers fall back to the heuristic
    #[error("Valuation oracle unavailable for item {item_id}")]
    ValuationUnavailable { item_id: String },

    /// Not enough XP or fiat to cover a paid feature
    #[error("Insufficient funds for {agent_id}: requested {requested}, available {available}")]
    InsufficientFunds {
        agent_id: String,
        requested: f64,
        available: f64,
    },

    /// Malformed values map; alignment defaults to zero
    #[error("Alignment computation failed: {reason}")]
    AlignmentComputation { reason: String },

    // ========================================================================
    // Coalition Errors
    // ========================================================================

    /// Coalition not found
    #[error("Coalition {coalition_id} not found")]
    CoalitionNotFound { coalition_id: String },

    /// Operation against a coalition in the wrong state
    #[error("Coalition {coalition_id} is {state}; operation requires {required}")]
    InvalidCoalitionState {
        coalition_id: String,
        state: String,
        required: String,
    },

    /// Agent is not a member of the coalition
    #[error("Agent {agent_id} is not a member of coalition {coalition_id}")]
    NotACoalitionMember {
        coalition_id: String,
        agent_id: String,
    },

    // ========================================================================
    // Ownership Errors
    // ========================================================================

    /// Expected-owner mismatch on mint; no partial write occurred
    #[error("Ownership conflict on item {item_id}: expected owner {expected}, found {actual}")]
    OwnershipConflict {
        item_id: String,
        expected: String,
        actual: String,
    },

    // ========================================================================
    // Negotiation Errors
    // ========================================================================

    /// Proposal not found
    #[error("Proposal {proposal_id} not found")]
    ProposalNotFound { proposal_id: String },

    /// Proposal already reached a terminal state
    #[error("Proposal {proposal_id} is already terminal ({status})")]
    ProposalAlreadyTerminal {
        proposal_id: String,
        status: String,
    },

    // ========================================================================
    // General Errors
    // ========================================================================

    /// Agent not found in the profile store
    #[error("Agent {agent_id} not found")]
    AgentNotFound { agent_id: String },

    /// Invalid input
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BazaarError {
    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Check if this is a retriable error
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::ValuationUnavailable { .. } | Self::Internal { .. }
        )
    }

    /// Get an error code for log and API surfaces
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ValuationUnavailable { .. } => "VALUATION_UNAVAILABLE",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::AlignmentComputation { .. } => "ALIGNMENT_COMPUTATION",
            Self::CoalitionNotFound { .. } => "COALITION_NOT_FOUND",
            Self::InvalidCoalitionState { .. } => "INVALID_COALITION_STATE",
            Self::NotACoalitionMember { .. } => "NOT_A_COALITION_MEMBER",
            Self::OwnershipConflict { .. } => "OWNERSHIP_CONFLICT",
            Self::ProposalNotFound { .. } => "PROPOSAL_NOT_FOUND",
            Self::ProposalAlreadyTerminal { .. } => "PROPOSAL_ALREADY_TERMINAL",
            Self::AgentNotFound { .. } => "AGENT_NOT_FOUND",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = BazaarError::OwnershipConflict {
            item_id: "item_1".to_string(),
            expected: "agent_a".to_string(),
            actual: "agent_b".to_string(),
        };
        assert_eq!(err.error_code(), "OWNERSHIP_CONFLICT");
    }

    #[test]
    fn test_retriable_errors() {
        let oracle = BazaarError::ValuationUnavailable {
            item_id: "item_1".to_string(),
        };
        assert!(oracle.is_retriable());

        let conflict = BazaarError::CoalitionNotFound {
            coalition_id: "coal_1".to_string(),
        };
        assert!(!conflict.is_retriable());
    }
}
