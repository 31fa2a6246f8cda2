//! Economy boundary: where buffered payouts end up.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

use jobcraft_core::PlayerId;

/// Payment failure reported by an economy backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EconomyError {
    #[error("no account for player {0}")]
    NoAccount(PlayerId),
    #[error("insufficient funds for player {0}")]
    InsufficientFunds(PlayerId),
    #[error("economy backend error: {0}")]
    Backend(String),
}

/// External ledger that actually moves currency.
///
/// Only the payout worker calls this; it may block on I/O.
pub trait Economy: Send + Sync {
    /// Credit (or, for negative amounts, debit) `amount` to `player`.
    fn pay(&self, player: PlayerId, amount: f64) -> Result<(), EconomyError>;
}

impl<E: Economy + ?Sized> Economy for std::sync::Arc<E> {
    fn pay(&self, player: PlayerId, amount: f64) -> Result<(), EconomyError> {
        (**self).pay(player, amount)
    }
}

/// In-memory economy for tests/dev.
///
/// Keeps balances and the ordered list of payment calls. Balances may not
/// go negative.
#[derive(Debug, Default)]
pub struct InMemoryEconomy {
    inner: Mutex<Ledger>,
}

#[derive(Debug, Default)]
struct Ledger {
    balances: HashMap<PlayerId, f64>,
    payments: Vec<(PlayerId, f64)>,
}

impl InMemoryEconomy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, player: PlayerId) -> f64 {
        let ledger = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        ledger.balances.get(&player).copied().unwrap_or(0.0)
    }

    /// Every successful `pay` call, in order.
    pub fn payments(&self) -> Vec<(PlayerId, f64)> {
        let ledger = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        ledger.payments.clone()
    }

    /// Sum of every successful payment.
    pub fn total_paid(&self) -> f64 {
        self.payments().iter().map(|(_, amount)| amount).sum()
    }
}

impl Economy for InMemoryEconomy {
    fn pay(&self, player: PlayerId, amount: f64) -> Result<(), EconomyError> {
        let mut ledger = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let balance = ledger.balances.entry(player).or_insert(0.0);
        if *balance + amount < 0.0 {
            return Err(EconomyError::InsufficientFunds(player));
        }
        *balance += amount;
        ledger.payments.push((player, amount));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payments_accumulate_into_balance() {
        let economy = InMemoryEconomy::new();
        let player = PlayerId::new();
        economy.pay(player, 10.0).unwrap();
        economy.pay(player, -4.0).unwrap();
        assert_eq!(economy.balance(player), 6.0);
        assert_eq!(economy.payments().len(), 2);
    }

    #[test]
    fn overdraft_is_rejected() {
        let economy = InMemoryEconomy::new();
        let player = PlayerId::new();
        assert_eq!(
            economy.pay(player, -1.0),
            Err(EconomyError::InsufficientFunds(player))
        );
        assert_eq!(economy.balance(player), 0.0);
        assert!(economy.payments().is_empty());
    }
}
