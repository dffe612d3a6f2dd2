//! Collaborators the panels talk to: the wallet that owns accounts and
//! signs, and the ledger client that builds, submits and confirms.

pub mod ledger;
pub mod transaction;
pub mod wallet;

use crate::error::{LedgerError, WalletError};
use crate::models::{Address, MicroAlgos};
use async_trait::async_trait;

pub use ledger::SimulatedLedger;
pub use transaction::{
    Confirmation, GroupId, OnComplete, SuggestedParams, Transaction, TxId, TxnKind, abi_selector,
};
pub use wallet::LocalWallet;

pub struct PaymentParams {
    pub sender: Address,
    pub receiver: Address,
    pub amount: MicroAlgos,
    pub params: SuggestedParams,
}

pub struct AssetOptInParams {
    pub sender: Address,
    pub asset_id: u64,
    pub params: SuggestedParams,
}

pub struct AppCallParams {
    pub sender: Address,
    pub app_id: u64,
    pub args: Vec<Vec<u8>>,
    pub foreign_assets: Vec<u64>,
    pub params: SuggestedParams,
}

#[async_trait]
pub trait WalletAdapter: Send + Sync {
    /// Accounts offered in the wallet-selection overlay.
    fn accounts(&self) -> Vec<Address>;

    fn active_address(&self) -> Option<Address>;

    async fn connect(&self, address: &Address) -> Result<(), WalletError>;

    async fn disconnect(&self);

    /// Signs the transactions at `signer_indices`, returning one encoded
    /// signed payload per index, in index order.
    async fn sign(
        &self,
        txns: &[Transaction],
        signer_indices: &[usize],
    ) -> Result<Vec<Vec<u8>>, WalletError>;
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn suggested_params(&self) -> Result<SuggestedParams, LedgerError>;

    fn build_payment(&self, p: PaymentParams) -> Transaction {
        Transaction::new(
            p.sender,
            &p.params,
            TxnKind::Payment {
                receiver: p.receiver,
                amount: p.amount,
            },
        )
    }

    /// Zero-amount asset transfer to self.
    fn build_asset_opt_in(&self, p: AssetOptInParams) -> Transaction {
        let receiver = p.sender.clone();
        Transaction::new(
            p.sender,
            &p.params,
            TxnKind::AssetTransfer {
                receiver,
                asset_id: p.asset_id,
                amount: 0,
            },
        )
    }

    fn build_app_call(&self, p: AppCallParams) -> Transaction {
        Transaction::new(
            p.sender,
            &p.params,
            TxnKind::AppCall {
                app_id: p.app_id,
                on_complete: OnComplete::NoOp,
                args: p.args,
                foreign_assets: p.foreign_assets,
            },
        )
    }

    fn assign_group(&self, txns: &mut [Transaction]) -> Result<GroupId, LedgerError> {
        Ok(transaction::assign_group(txns)?)
    }

    /// Submits one transaction or one whole group; returns the first id.
    async fn submit_raw(&self, signed: Vec<Vec<u8>>) -> Result<TxId, LedgerError>;

    async fn wait_for_confirmation(
        &self,
        txid: &TxId,
        max_rounds: u64,
    ) -> Result<Confirmation, LedgerError>;
}
