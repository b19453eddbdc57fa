//! Bazaar Ownership Chain
//!
//! Append-only ledger of item ownership. The chain is:
//! - Item-scoped (each item has its own record log)
//! - Immutable (past records never change, except the single
//!   `is_current` flip performed atomically with the next mint)
//! - Index-backed (current owner lookup is O(1))
//!
//! # Invariants
//!
//! 1. For every minted item, exactly one record has `is_current = true`
//! 2. Provenance length equals the number of mints for that item
//! 3. A failed mint writes nothing
//!
//! Concurrent mints on the same item are serialized by the backing
//! `DashMap` entry lock; mints on different items never contend.

use bazaar_types::{
    AgentId, BazaarError, CorrelationId, ItemId, OwnerPrecondition, OwnershipRecord, RecordId,
    Result,
};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

/// Per-item record log plus the index of the current record
#[derive(Debug, Default)]
struct ItemChain {
    records: Vec<OwnershipRecord>,
    /// Index into `records` of the record with `is_current = true`
    current: usize,
}

impl ItemChain {
    fn current_owner(&self) -> Option<&AgentId> {
        self.records.get(self.current).map(|r| &r.owner)
    }
}

/// The ownership chain for all items
#[derive(Clone, Default)]
pub struct OwnershipChain {
    items: Arc<DashMap<ItemId, ItemChain>>,
}

impl OwnershipChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a new ownership record for an item
    ///
    /// Atomically flips the previously current record (if any) to
    /// `is_current = false` and appends the new record with
    /// `is_current = true`. The precondition is verified against the
    /// actual current owner before anything is written; a mismatch fails
    /// with `OwnershipConflict` and leaves the chain untouched.
    pub fn mint(
        &self,
        item_id: &ItemId,
        new_owner: &AgentId,
        precondition: OwnerPrecondition,
        correlation_id: CorrelationId,
    ) -> Result<OwnershipRecord> {
        let mut chain = self.items.entry(item_id.clone()).or_default();

        match (&precondition, chain.current_owner()) {
            (OwnerPrecondition::Any, _) => {}
            (OwnerPrecondition::Unowned, None) => {}
            (OwnerPrecondition::Unowned, Some(actual)) => {
                return Err(BazaarError::OwnershipConflict {
                    item_id: item_id.to_string(),
                    expected: "unowned".to_string(),
                    actual: actual.to_string(),
                });
            }
            (OwnerPrecondition::Owner(expected), Some(actual)) if expected == actual => {}
            (OwnerPrecondition::Owner(expected), actual) => {
                return Err(BazaarError::OwnershipConflict {
                    item_id: item_id.to_string(),
                    expected: expected.to_string(),
                    actual: actual
                        .map(|a| a.to_string())
                        .unwrap_or_else(|| "unowned".to_string()),
                });
            }
        }

        // Flip the old head; a no-op for the first mint of an item
        let head = chain.current;
        if let Some(record) = chain.records.get_mut(head) {
            record.is_current = false;
        }

        let record = OwnershipRecord {
            record_id: RecordId::new(),
            item_id: item_id.clone(),
            owner: new_owner.clone(),
            is_current: true,
            timestamp: Utc::now(),
            correlation_id: correlation_id.clone(),
        };

        chain.records.push(record.clone());
        chain.current = chain.records.len() - 1;

        info!(
            item_id = %item_id,
            owner = %new_owner,
            correlation_id = %correlation_id,
            mint_count = chain.records.len(),
            "ownership record minted"
        );
        Ok(record)
    }

    /// Current owner of an item, if it has ever been minted
    pub fn current_owner(&self, item_id: &ItemId) -> Option<AgentId> {
        self.items
            .get(item_id)
            .and_then(|chain| chain.current_owner().cloned())
    }

    /// Full provenance for an item, oldest first
    ///
    /// Records are immutable once written; the returned clones are safe to
    /// expose without any locking.
    pub fn provenance(&self, item_id: &ItemId) -> Vec<OwnershipRecord> {
        self.items
            .get(item_id)
            .map(|chain| chain.records.clone())
            .unwrap_or_default()
    }

    /// Total number of mints for an item
    pub fn mint_count(&self, item_id: &ItemId) -> usize {
        self.items.get(item_id).map(|c| c.records.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mint_any(chain: &OwnershipChain, item: &ItemId, owner: &AgentId) -> OwnershipRecord {
        chain
            .mint(item, owner, OwnerPrecondition::Any, CorrelationId::new())
            .unwrap()
    }

    #[test]
    fn test_mint_then_transfer() {
        let chain = OwnershipChain::new();
        let item = ItemId::new();
        let x = AgentId::new();
        let y = AgentId::new();

        mint_any(&chain, &item, &x);
        assert_eq!(chain.current_owner(&item), Some(x.clone()));

        mint_any(&chain, &item, &y);
        assert_eq!(chain.current_owner(&item), Some(y.clone()));

        let provenance = chain.provenance(&item);
        assert_eq!(provenance.len(), 2);
        assert_eq!(provenance[0].owner, x);
        assert!(!provenance[0].is_current);
        assert_eq!(provenance[1].owner, y);
        assert!(provenance[1].is_current);
    }

    #[test]
    fn test_exactly_one_current_record() {
        let chain = OwnershipChain::new();
        let item = ItemId::new();

        for _ in 0..5 {
            mint_any(&chain, &item, &AgentId::new());
        }

        let provenance = chain.provenance(&item);
        assert_eq!(provenance.len(), 5);
        assert_eq!(chain.mint_count(&item), 5);
        let current_count = provenance.iter().filter(|r| r.is_current).count();
        assert_eq!(current_count, 1);
        assert!(provenance.last().unwrap().is_current);
    }

    #[test]
    fn test_unowned_precondition() {
        let chain = OwnershipChain::new();
        let item = ItemId::new();
        let x = AgentId::new();

        chain
            .mint(&item, &x, OwnerPrecondition::Unowned, CorrelationId::new())
            .unwrap();

        // Second unowned mint conflicts
        let result = chain.mint(
            &item,
            &AgentId::new(),
            OwnerPrecondition::Unowned,
            CorrelationId::new(),
        );
        assert!(matches!(result, Err(BazaarError::OwnershipConflict { .. })));
        // No partial write
        assert_eq!(chain.mint_count(&item), 1);
        assert_eq!(chain.current_owner(&item), Some(x));
    }

    #[test]
    fn test_expected_owner_precondition() {
        let chain = OwnershipChain::new();
        let item = ItemId::new();
        let x = AgentId::new();
        let y = AgentId::new();
        let z = AgentId::new();

        mint_any(&chain, &item, &x);

        // Stale expectation: y believes it owns the item
        let result = chain.mint(
            &item,
            &z,
            OwnerPrecondition::Owner(y.clone()),
            CorrelationId::new(),
        );
        assert!(matches!(result, Err(BazaarError::OwnershipConflict { .. })));

        // Correct expectation succeeds
        chain
            .mint(&item, &y, OwnerPrecondition::Owner(x), CorrelationId::new())
            .unwrap();
        assert_eq!(chain.current_owner(&item), Some(y));
    }

    #[test]
    fn test_unknown_item() {
        let chain = OwnershipChain::new();
        let item = ItemId::new();
        assert_eq!(chain.current_owner(&item), None);
        assert!(chain.provenance(&item).is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_mints_serialize() {
        let chain = OwnershipChain::new();
        let item = ItemId::new();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let chain = chain.clone();
            let item = item.clone();
            handles.push(tokio::spawn(async move {
                chain
                    .mint(
                        &item,
                        &AgentId::new(),
                        OwnerPrecondition::Any,
                        CorrelationId::new(),
                    )
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let provenance = chain.provenance(&item);
        assert_eq!(provenance.len(), 16);
        assert_eq!(provenance.iter().filter(|r| r.is_current).count(), 1);
    }
}
