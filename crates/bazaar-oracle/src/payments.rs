//! In-memory payment service
//!
//! Balance-map implementation of the payment collaborator. Real wallet
//! signing and on-chain execution live outside the core; this keeps
//! micropayment accounting honest in simulations and tests.

use crate::{OracleError, OracleResult, PaymentService, Receipt};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Payment service backed by an in-memory balance map keyed by wallet ref
#[derive(Clone, Default)]
pub struct InMemoryPayments {
    balances: Arc<DashMap<String, f64>>,
    next_receipt: Arc<AtomicU64>,
}

impl InMemoryPayments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fund a wallet
    pub fn deposit(&self, wallet: &str, amount: f64) {
        *self.balances.entry(wallet.to_string()).or_insert(0.0) += amount;
    }

    /// Current balance; unknown wallets are empty
    pub fn balance(&self, wallet: &str) -> f64 {
        self.balances.get(wallet).map(|b| *b).unwrap_or(0.0)
    }
}

#[async_trait]
impl PaymentService for InMemoryPayments {
    async fn pay(&self, amount: f64, payer_wallet: &str) -> OracleResult<Receipt> {
        if amount < 0.0 || !amount.is_finite() {
            return Err(OracleError::InvalidResponse {
                message: format!("invalid payment amount {amount}"),
            });
        }

        let mut balance = self
            .balances
            .entry(payer_wallet.to_string())
            .or_insert(0.0);
        if *balance < amount {
            return Err(OracleError::PaymentFailed {
                requested: amount,
                available: *balance,
            });
        }
        *balance -= amount;

        let seq = self.next_receipt.fetch_add(1, Ordering::Relaxed);
        debug!(payer_wallet, amount, remaining = *balance, "payment executed");
        Ok(Receipt {
            receipt_id: format!("receipt_{seq}"),
            payer_wallet: payer_wallet.to_string(),
            amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pay_debits_balance() {
        let payments = InMemoryPayments::new();
        payments.deposit("wallet_a", 1.0);

        let receipt = payments.pay(0.25, "wallet_a").await.unwrap();
        assert_eq!(receipt.amount, 0.25);
        assert!((payments.balance("wallet_a") - 0.75).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_pay_insufficient() {
        let payments = InMemoryPayments::new();
        payments.deposit("wallet_a", 0.1);

        let result = payments.pay(0.5, "wallet_a").await;
        assert!(matches!(result, Err(OracleError::PaymentFailed { .. })));
        // No partial debit
        assert!((payments.balance("wallet_a") - 0.1).abs() < 1e-9);
    }
}
