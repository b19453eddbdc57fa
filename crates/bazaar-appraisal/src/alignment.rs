//! Alignment scoring between two agents' value-weight maps

use bazaar_types::{AgentProfile, CorrelationId};
use std::collections::BTreeSet;
use tracing::warn;

/// Similarity between the appraiser's and counterpart's value maps, in [0, 1]
///
/// Shared keys contribute `1 - |wa - wb|` each; the sum is averaged over
/// the union of keys, so disjoint maps score 0 and identical maps score 1.
/// Malformed weights (non-finite) degrade to 0.0 with a log line rather
/// than failing the appraisal.
pub fn alignment_score(
    appraiser: &AgentProfile,
    counterpart: Option<&AgentProfile>,
    correlation_id: &CorrelationId,
) -> f64 {
    let Some(counterpart) = counterpart else {
        return 0.0;
    };
    if appraiser.values.is_empty() || counterpart.values.is_empty() {
        return 0.0;
    }

    let malformed = appraiser
        .values
        .values()
        .chain(counterpart.values.values())
        .any(|w| !w.is_finite());
    if malformed {
        warn!(
            correlation_id = %correlation_id,
            appraiser = %appraiser.agent_id,
            "malformed values map, alignment defaults to 0"
        );
        return 0.0;
    }

    let keys: BTreeSet<&String> = appraiser
        .values
        .keys()
        .chain(counterpart.values.keys())
        .collect();

    let mut overlap = 0.0;
    for key in &keys {
        if let (Some(wa), Some(wb)) = (appraiser.values.get(*key), counterpart.values.get(*key)) {
            overlap += 1.0 - (wa - wb).abs();
        }
    }

    (overlap / keys.len() as f64).clamp(0.0, 1.0)
}
