//! Token settlement for purchases
//!
//! Payments happen in LAND tokens on chain. The marketplace only needs to read
//! a balance and move tokens, so both are behind the `Settlement` trait.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::error::{LandshareError, Result};

#[async_trait]
pub trait Settlement: Send + Sync {
    /// LAND token balance of `address`
    async fn balance_of(&self, address: &str) -> Result<f64>;

    /// Move `amount` tokens from `from` to `to`, returning the transaction hash
    async fn transfer(&self, from: &str, to: &str, amount: f64) -> Result<String>;
}

/// In-memory ledger for offline use and tests. Addresses are case-insensitive.
#[derive(Debug, Default)]
pub struct PaperLedger {
    balances: Mutex<HashMap<String, f64>>,
    transfers: AtomicU64,
}

impl PaperLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credit(&self, address: &str, amount: f64) {
        *self
            .balances
            .lock()
            .entry(address.to_lowercase())
            .or_default() += amount;
    }

    pub fn balance(&self, address: &str) -> f64 {
        self.balances
            .lock()
            .get(&address.to_lowercase())
            .copied()
            .unwrap_or(0.0)
    }
}

#[async_trait]
impl Settlement for PaperLedger {
    async fn balance_of(&self, address: &str) -> Result<f64> {
        Ok(self.balance(address))
    }

    async fn transfer(&self, from: &str, to: &str, amount: f64) -> Result<String> {
        if amount <= 0.0 {
            return Err(LandshareError::invalid("amount", "must be positive"));
        }

        let mut balances = self.balances.lock();
        let from_key = from.to_lowercase();
        let available = balances.get(&from_key).copied().unwrap_or(0.0);
        if available < amount {
            return Err(LandshareError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        balances.insert(from_key, available - amount);
        *balances.entry(to.to_lowercase()).or_default() += amount;
        drop(balances);

        let n = self.transfers.fetch_add(1, Ordering::SeqCst) + 1;
        let tx_hash = format!("0x{:064x}", n);
        debug!("Paper transfer of {} from {} to {}: {}", amount, from, to, tx_hash);
        Ok(tx_hash)
    }
}

/// Settlement already done in a wallet: the operator supplies the balance
/// seen before the purchase and the transaction hash of the transfer.
#[derive(Debug, Clone)]
pub struct RecordedSettlement {
    balance: f64,
    tx_hash: String,
}

impl RecordedSettlement {
    pub fn new(balance: f64, tx_hash: impl Into<String>) -> Self {
        Self {
            balance,
            tx_hash: tx_hash.into(),
        }
    }
}

#[async_trait]
impl Settlement for RecordedSettlement {
    async fn balance_of(&self, _address: &str) -> Result<f64> {
        Ok(self.balance)
    }

    async fn transfer(&self, _from: &str, _to: &str, amount: f64) -> Result<String> {
        if amount > self.balance {
            return Err(LandshareError::InsufficientBalance {
                needed: amount,
                available: self.balance,
            });
        }
        if self.tx_hash.is_empty() {
            return Err(LandshareError::Settlement(
                "no transaction hash recorded for the transfer".to_string(),
            ));
        }
        Ok(self.tx_hash.clone())
    }
}
