//! Per-address simulated credit, kept in session storage and announced to
//! listeners through a broadcast channel.

mod session;

pub use session::SessionStorage;

use crate::error::{AmountError, VoteError};
use crate::models::{Address, Credit, TokenAmount};
use log::{debug, warn};
use std::sync::Mutex;
use tokio::sync::broadcast;

const SIGNAL_CAPACITY: usize = 16;

/// Zero-payload "credit changed, recompute" notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditSignal;

pub struct CreditStore {
    storage: SessionStorage,
    prefix: String,
    signal: broadcast::Sender<CreditSignal>,
    // Serializes read-modify-write so two settlements cannot both spend the same credit.
    update: Mutex<()>,
}

impl CreditStore {
    pub fn new(prefix: &str) -> Self {
        let (signal, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self {
            storage: SessionStorage::new(),
            prefix: prefix.to_string(),
            signal,
            update: Mutex::new(()),
        }
    }

    fn key(&self, address: &Address) -> String {
        format!("{}{}", self.prefix, address)
    }

    /// Stored credit, or None when nothing was ever written for the address.
    pub fn get_credit(&self, address: &Address) -> Option<Credit> {
        let key = self.key(address);
        let raw = self.storage.get_item(&key)?;
        match raw.parse() {
            Ok(credit) => Some(credit),
            Err(e) => {
                warn!("Ignoring unreadable credit under {}: {}", key, e);
                None
            }
        }
    }

    /// Persists and announces a new credit.
    pub fn set_credit(&self, address: &Address, credit: Credit) {
        let key = self.key(address);
        debug!("Session {} = {}", key, credit);
        self.storage.set_item(&key, credit.to_string());
        self.notify();
    }

    /// Spends `cost` ANJ from the address's credit.
    ///
    /// The balance is read and rewritten under one lock; a cost larger than
    /// the balance leaves the stored value untouched.
    pub fn spend_tokens(&self, address: &Address, cost: TokenAmount) -> Result<Credit, VoteError> {
        let _guard = self.update.lock().unwrap_or_else(|e| e.into_inner());
        let balance = self.get_credit(address).unwrap_or(Credit::ZERO).to_tokens();
        let remaining = balance
            .checked_sub(cost)
            .ok_or(VoteError::InsufficientBalance { balance, cost })?;
        let credit = remaining.to_credit();
        self.set_credit(address, credit);
        Ok(credit)
    }

    /// Credits the ANJ a confirmed donation returned, converted back at the
    /// display rate so the shown balance grows by exactly `received`.
    pub fn record_donation(
        &self,
        address: &Address,
        received: TokenAmount,
    ) -> Result<Credit, AmountError> {
        let _guard = self.update.lock().unwrap_or_else(|e| e.into_inner());
        let current = self.get_credit(address).unwrap_or(Credit::ZERO);
        let credit = current
            .checked_add(received.to_credit())
            .ok_or_else(|| AmountError::Overflow(format!("{} + {}", current.to_tokens(), received)))?;
        self.set_credit(address, credit);
        Ok(credit)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CreditSignal> {
        self.signal.subscribe()
    }

    pub fn notify(&self) {
        // No receivers is fine: nothing is mounted yet.
        let _ = self.signal.send(CreditSignal);
    }

    pub fn entry_count(&self) -> usize {
        self.storage.len()
    }

    pub fn end_session(&self) {
        self.storage.clear();
        self.notify();
    }

    #[cfg(test)]
    pub fn access_count(&self) -> usize {
        self.storage.access_count()
    }
}
