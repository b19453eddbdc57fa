//! Negotiation proposal types

use crate::{AgentId, CorrelationId, ItemId, ProposalId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a proposal ended up rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Proposer's own appraisal fell below its acceptance floor;
    /// the target never saw the proposal
    BelowFloor,
    /// Target's acceptance draw failed
    Declined,
    /// Proposer walked away before a terminal state was reached
    Abandoned,
    /// Proposal sat in a non-terminal state past its TTL
    Expired,
}

/// Proposal state machine
///
/// `Proposed → (PitchGenerated)? → Evaluated → {Accepted | Rejected}`.
/// `Accepted` and `Rejected` are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Proposed,
    PitchGenerated,
    Evaluated,
    Accepted,
    Rejected { reason: RejectReason },
}

impl ProposalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProposalStatus::Accepted | ProposalStatus::Rejected { .. })
    }
}

/// One negotiation between two agents over one item
///
/// Immutable after reaching a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationProposal {
    pub proposal_id: ProposalId,
    pub proposer: AgentId,
    pub target: AgentId,
    pub item_id: ItemId,
    pub pitch: Option<String>,
    /// Alignment between the two agents' value maps, in [0, 1]
    pub alignment_score: f64,
    /// Final acceptance probability the decision was drawn against
    pub acceptance_probability: f64,
    pub status: ProposalStatus,
    pub correlation_id: CorrelationId,
    pub created_at: DateTime<Utc>,
}

impl NegotiationProposal {
    pub fn accepted(&self) -> bool {
        self.status == ProposalStatus::Accepted
    }
}
