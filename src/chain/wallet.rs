use crate::chain::WalletAdapter;
use crate::chain::transaction::{SignedTransaction, Transaction, signature_digest};
use crate::error::WalletError;
use crate::models::Address;
use async_trait::async_trait;
use log::{debug, info};
use std::sync::Mutex;

/// In-process wallet over a fixed set of dev accounts.
pub struct LocalWallet {
    accounts: Vec<Address>,
    active: Mutex<Option<Address>>,
}

impl LocalWallet {
    pub fn new(accounts: Vec<Address>) -> Self {
        Self {
            accounts,
            active: Mutex::new(None),
        }
    }

    /// `count` deterministic accounts derived from `dev-0`, `dev-1`, ...
    pub fn with_dev_accounts(count: usize) -> Self {
        let accounts = (0..count)
            .map(|i| Address::from_seed(format!("dev-{}", i).as_bytes()))
            .collect();
        Self::new(accounts)
    }

    fn sign_one(&self, signer: &Address, txn: &Transaction) -> Result<Vec<u8>, WalletError> {
        if &txn.sender != signer {
            return Err(WalletError::Rejected(format!(
                "transaction sender {} is not the connected account",
                txn.sender.short()
            )));
        }
        let sig = signature_digest(signer, &txn.encode()?);
        let signed = SignedTransaction {
            txn: txn.clone(),
            signer: signer.clone(),
            sig,
        };
        Ok(serde_json::to_vec(&signed)?)
    }
}

#[async_trait]
impl WalletAdapter for LocalWallet {
    fn accounts(&self) -> Vec<Address> {
        self.accounts.clone()
    }

    fn active_address(&self) -> Option<Address> {
        self.active.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn connect(&self, address: &Address) -> Result<(), WalletError> {
        if !self.accounts.contains(address) {
            return Err(WalletError::UnknownAccount(address.to_string()));
        }
        *self.active.lock().unwrap_or_else(|e| e.into_inner()) = Some(address.clone());
        info!("Wallet connected: {}", address.short());
        Ok(())
    }

    async fn disconnect(&self) {
        if let Some(previous) = self.active.lock().unwrap_or_else(|e| e.into_inner()).take() {
            info!("Wallet disconnected: {}", previous.short());
        }
    }

    async fn sign(
        &self,
        txns: &[Transaction],
        signer_indices: &[usize],
    ) -> Result<Vec<Vec<u8>>, WalletError> {
        let signer = self.active_address().ok_or(WalletError::NotConnected)?;
        debug!("Signing {} of {} transaction(s)", signer_indices.len(), txns.len());

        signer_indices
            .iter()
            .map(|&i| {
                let txn = txns.get(i).ok_or_else(|| {
                    WalletError::Rejected(format!("signer index {} out of range", i))
                })?;
                self.sign_one(&signer, txn)
            })
            .collect()
    }
}
