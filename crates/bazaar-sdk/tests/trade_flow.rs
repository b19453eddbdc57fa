//! End-to-end trade flow tests against the Bazaar facade

use std::collections::BTreeSet;
use std::sync::Arc;

use bazaar_negotiation::FixedSampler;
use bazaar_oracle::OfflineOracle;
use bazaar_sdk::Bazaar;
use bazaar_types::{
    AgentId, AgentProfile, Archetype, BazaarError, ItemListing, OwnerPrecondition,
    ProposalStatus, RejectReason, TradeContext, TradeOutcome,
};

async fn register_pair(bazaar: &Bazaar) -> (AgentId, AgentId) {
    let proposer = AgentProfile::new(AgentId::new(), "trade up to a house", Archetype::Default)
        .with_value("novelty", 0.8)
        .with_wallet("wallet_proposer");
    let mut target = AgentProfile::new(AgentId::new(), "collect curiosities", Archetype::Default)
        .with_wallet("wallet_target");
    target.values = proposer.values.clone();

    let proposer_id = proposer.agent_id.clone();
    let target_id = target.agent_id.clone();
    bazaar.register_agent(proposer).await.unwrap();
    bazaar.register_agent(target).await.unwrap();
    (proposer_id, target_id)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn accepting_bazaar() -> Bazaar {
    init_tracing();
    Bazaar::builder()
        .sampler(Arc::new(FixedSampler(0.0)))
        .build()
}

#[tokio::test]
async fn accepted_trade_settles_ownership_and_reputation() {
    let bazaar = accepting_bazaar();
    let (proposer, target) = register_pair(&bazaar).await;
    let item = ItemListing::new("red paperclip", 100.0);

    // Genesis assignment to the proposer
    bazaar
        .mint_ownership_record(&item.item_id, &proposer, OwnerPrecondition::Unowned)
        .unwrap();

    let report = bazaar
        .negotiate_trade(&proposer, &target, &item, &TradeContext::Trade, false, None)
        .await
        .unwrap();

    assert!(report.proposal.accepted());
    assert!(report.minted.is_some());
    assert_eq!(bazaar.current_owner(&item.item_id), Some(target.clone()));

    let provenance = bazaar.provenance(&item.item_id);
    assert_eq!(provenance.len(), 2);
    assert_eq!(provenance[0].owner, proposer);
    assert!(!provenance[0].is_current);
    assert_eq!(provenance[1].owner, target);
    assert!(provenance[1].is_current);

    // Both parties gained reputation and recorded a success
    for agent in [&proposer, &target] {
        let history = bazaar.reputation().history(agent);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].outcome, TradeOutcome::Success);
        assert!(bazaar.reputation().reputation(agent) > 0.5);
        // Profile view observes the new standing
        let profile = bazaar.profiles().get(agent).await.unwrap();
        assert!(profile.reputation > 0.5);
    }
}

#[tokio::test]
async fn unowned_item_trades_without_genesis_mint() {
    let bazaar = accepting_bazaar();
    let (proposer, target) = register_pair(&bazaar).await;
    let item = ItemListing::new("bottle cap", 10.0);

    let report = bazaar
        .negotiate_trade(&proposer, &target, &item, &TradeContext::Trade, false, None)
        .await
        .unwrap();

    assert!(report.proposal.accepted());
    assert_eq!(bazaar.current_owner(&item.item_id), Some(target));
    assert_eq!(bazaar.provenance(&item.item_id).len(), 1);
}

#[tokio::test]
async fn rejected_trade_changes_no_ownership() {
    init_tracing();
    // Draw above the 0.9 ceiling a pitch-less trade can reach
    let bazaar = Bazaar::builder()
        .sampler(Arc::new(FixedSampler(0.95)))
        .build();
    let (proposer, target) = register_pair(&bazaar).await;
    let item = ItemListing::new("red paperclip", 100.0);

    bazaar
        .mint_ownership_record(&item.item_id, &proposer, OwnerPrecondition::Unowned)
        .unwrap();

    let report = bazaar
        .negotiate_trade(&proposer, &target, &item, &TradeContext::Trade, false, None)
        .await
        .unwrap();

    assert_eq!(
        report.proposal.status,
        ProposalStatus::Rejected {
            reason: RejectReason::Declined
        }
    );
    assert!(report.minted.is_none());
    // Ownership unchanged, provenance untouched
    assert_eq!(bazaar.current_owner(&item.item_id), Some(proposer.clone()));
    assert_eq!(bazaar.provenance(&item.item_id).len(), 1);

    // Only the proposer's history records the failure
    let history = bazaar.reputation().history(&proposer);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].outcome, TradeOutcome::Failure);
    assert!(bazaar.reputation().history(&target).is_empty());
}

#[tokio::test]
async fn below_floor_walkaway_never_reaches_target() {
    init_tracing();
    let bazaar = Bazaar::builder()
        .sampler(Arc::new(FixedSampler(0.0)))
        .oracle(Arc::new(OfflineOracle))
        .negotiation_config(bazaar_negotiation::NegotiationConfig {
            // With the oracle down the proposer's own appraisal of a
            // 400-value item lands around 245, well under this floor
            acceptance_floor: 450.0,
            ..Default::default()
        })
        .build();
    let (proposer, target) = register_pair(&bazaar).await;
    let item = ItemListing::new("red paperclip", 400.0);

    let report = bazaar
        .negotiate_trade(&proposer, &target, &item, &TradeContext::Trade, false, None)
        .await
        .unwrap();

    assert_eq!(
        report.proposal.status,
        ProposalStatus::Rejected {
            reason: RejectReason::BelowFloor
        }
    );
    assert!(bazaar.negotiation().delivered_to(&target).is_empty());
    assert_eq!(bazaar.current_owner(&item.item_id), None);
}

#[tokio::test]
async fn coalition_trade_pays_out_members() {
    let bazaar = accepting_bazaar();
    let (proposer, target) = register_pair(&bazaar).await;

    let members: BTreeSet<AgentId> = [proposer.clone(), target.clone()].into_iter().collect();
    let coalition = bazaar.form_coalition(members).await.unwrap();
    bazaar
        .accept_coalition(&coalition.coalition_id, &proposer)
        .unwrap();
    let active = bazaar
        .accept_coalition(&coalition.coalition_id, &target)
        .unwrap();

    let split = bazaar.coalition_split(&coalition.coalition_id).unwrap();
    let total: f64 = split.values().sum();
    assert!((total - 1.0).abs() <= 1e-6);
    assert_eq!(active.members.len(), 2);

    let item = ItemListing::new("shared trophy", 200.0);
    let report = bazaar
        .negotiate_trade(
            &proposer,
            &target,
            &item,
            &TradeContext::Coalition,
            false,
            Some(&coalition.coalition_id),
        )
        .await
        .unwrap();

    assert!(report.proposal.accepted());
    let payoff = report.payoff.expect("coalition trade pays out");
    // 5% of the 200 market value, split by reputation
    let paid: f64 = payoff.values().sum();
    assert!((paid - 10.0).abs() < 1e-9);
}

#[tokio::test]
async fn trade_of_foreign_item_surfaces_conflict() {
    let bazaar = accepting_bazaar();
    let (proposer, target) = register_pair(&bazaar).await;
    let third_party = AgentId::new();
    let item = ItemListing::new("stolen goods", 50.0);

    bazaar
        .mint_ownership_record(&item.item_id, &third_party, OwnerPrecondition::Unowned)
        .unwrap();

    let result = bazaar
        .negotiate_trade(&proposer, &target, &item, &TradeContext::Trade, false, None)
        .await;

    assert!(matches!(result, Err(BazaarError::OwnershipConflict { .. })));
    // No partial write: the third party still owns the item
    assert_eq!(bazaar.current_owner(&item.item_id), Some(third_party));
    assert_eq!(bazaar.provenance(&item.item_id).len(), 1);
}

#[tokio::test]
async fn provenance_tracks_every_mint() {
    let bazaar = accepting_bazaar();
    let item = ItemListing::new("relay baton", 10.0);

    let mut owners = Vec::new();
    for _ in 0..4 {
        let owner = AgentId::new();
        bazaar
            .mint_ownership_record(&item.item_id, &owner, OwnerPrecondition::Any)
            .unwrap();
        owners.push(owner);
    }

    let provenance = bazaar.provenance(&item.item_id);
    assert_eq!(provenance.len(), owners.len());
    assert_eq!(provenance.iter().filter(|r| r.is_current).count(), 1);
    assert_eq!(
        bazaar.current_owner(&item.item_id).as_ref(),
        owners.last()
    );
    for (record, owner) in provenance.iter().zip(&owners) {
        assert_eq!(&record.owner, owner);
    }
}
