//! Pooled entrance fees and the single-shot winner payout
//!
//! The treasury tracks the round's pot and funnels the payout through an
//! injected [`PayoutSink`]. The pot is withdrawn from the tracked balance
//! before the external transfer is attempted; a rejected transfer restores
//! it so the funds stay accounted for a later retry.

use crate::errors::{RaffleError, TransferError};
use crate::raffle::Amount;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Underlying transfer mechanism (ledger adapter, bank, ...).
#[async_trait]
pub trait PayoutSink: Send + Sync {
    async fn transfer(&self, to: &str, amount: Amount) -> Result<(), TransferError>;
}

/// Holds the pooled funds for the round in progress.
pub struct Treasury {
    balance: AtomicU64,
    sink: Arc<dyn PayoutSink>,
}

impl Treasury {
    pub fn new(sink: Arc<dyn PayoutSink>) -> Self {
        Self {
            balance: AtomicU64::new(0),
            sink,
        }
    }

    pub fn deposit(&self, amount: Amount) {
        self.balance.fetch_add(amount, Ordering::SeqCst);
    }

    pub fn balance(&self) -> Amount {
        self.balance.load(Ordering::SeqCst)
    }

    /// Withdraw the whole pot, zeroing the tracked balance.
    ///
    /// Called under the state machine lock, before the transfer is
    /// attempted, so no caller can observe a stale pot mid-payout.
    pub(crate) fn take_pot(&self) -> Amount {
        self.balance.swap(0, Ordering::SeqCst)
    }

    /// Transfer a previously withdrawn pot to the winner.
    pub async fn payout(&self, to: &str, amount: Amount) -> Result<(), RaffleError> {
        if let Err(e) = self.sink.transfer(to, amount).await {
            // funds stay tracked so the operations layer can retry
            self.balance.fetch_add(amount, Ordering::SeqCst);
            return Err(RaffleError::TransferFailed(e));
        }
        Ok(())
    }
}

/// In-process account book; the default sink.
#[derive(Default)]
pub struct MemoryBank {
    accounts: DashMap<String, Amount>,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &str) -> Amount {
        self.accounts.get(account).map(|b| *b).unwrap_or(0)
    }
}

#[async_trait]
impl PayoutSink for MemoryBank {
    async fn transfer(&self, to: &str, amount: Amount) -> Result<(), TransferError> {
        *self.accounts.entry(to.to_string()).or_insert(0) += amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RejectingSink;

    #[async_trait]
    impl PayoutSink for RejectingSink {
        async fn transfer(&self, _to: &str, _amount: Amount) -> Result<(), TransferError> {
            Err(TransferError("receiver cannot accept funds".to_string()))
        }
    }

    #[tokio::test]
    async fn deposits_accumulate_and_payout_credits_winner() {
        let bank = Arc::new(MemoryBank::new());
        let treasury = Treasury::new(bank.clone());

        treasury.deposit(10);
        treasury.deposit(15);
        assert_eq!(treasury.balance(), 25);

        let pot = treasury.take_pot();
        assert_eq!(pot, 25);
        assert_eq!(treasury.balance(), 0);

        treasury.payout("alice", pot).await.unwrap();
        assert_eq!(bank.balance_of("alice"), 25);
    }

    #[tokio::test]
    async fn rejected_transfer_restores_balance() {
        let treasury = Treasury::new(Arc::new(RejectingSink));
        treasury.deposit(40);

        let pot = treasury.take_pot();
        assert_eq!(treasury.balance(), 0);

        let err = treasury.payout("alice", pot).await.unwrap_err();
        assert_eq!(err.code(), "TransferFailed");
        assert_eq!(treasury.balance(), 40);
    }
}
