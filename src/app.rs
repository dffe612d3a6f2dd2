use crate::balance::BalanceDisplay;
use crate::chain::{LedgerClient, LocalWallet, SimulatedLedger, WalletAdapter};
use crate::config::Config;
use crate::donation::DonationPanel;
use crate::feedback::FeedbackBoard;
use crate::models::community_polls;
use crate::store::CreditStore;
use crate::voting::{DelayedSettlement, Settlement, VotingPanel};
use log::info;
use std::sync::Arc;

/// Everything one console session owns: the shared credit store and the
/// three panels wired to the same wallet and ledger.
pub struct App {
    pub config: Config,
    pub wallet: Arc<LocalWallet>,
    pub ledger: Arc<SimulatedLedger>,
    pub store: Arc<CreditStore>,
    pub feedback: Arc<FeedbackBoard>,
    pub donation: DonationPanel,
    pub balance: Arc<BalanceDisplay>,
    pub voting: VotingPanel,
}

impl App {
    pub fn new(config: Config) -> Self {
        let settlement = Arc::new(DelayedSettlement::new(config.vote_delay));
        Self::with_settlement(config, settlement)
    }

    pub fn with_settlement(config: Config, settlement: Arc<dyn Settlement>) -> Self {
        let ledger = Arc::new(SimulatedLedger::new(
            config.app_id,
            config.asset_id,
            &config.genesis_id,
        ));
        let wallet = Arc::new(LocalWallet::with_dev_accounts(config.dev_accounts));
        for account in wallet.accounts() {
            ledger.fund(&account, config.dev_funding);
        }
        info!(
            "Ledger ready: app {} at {}, {} dev account(s) funded with {}",
            config.app_id,
            ledger.app_address().short(),
            config.dev_accounts,
            config.dev_funding
        );

        let store = Arc::new(CreditStore::new(&config.storage_prefix));
        let feedback = Arc::new(FeedbackBoard::new(config.feedback_ttl));
        let wallet_dyn: Arc<dyn WalletAdapter> = wallet.clone();
        let ledger_dyn: Arc<dyn LedgerClient> = ledger.clone();

        let donation = DonationPanel::new(
            &config,
            wallet_dyn.clone(),
            ledger_dyn,
            store.clone(),
            feedback.clone(),
        );
        let balance = Arc::new(BalanceDisplay::mount(store.clone(), wallet_dyn.clone()));
        let voting = VotingPanel::new(
            community_polls(),
            store.clone(),
            wallet_dyn,
            feedback.clone(),
            settlement,
        );

        Self {
            config,
            wallet,
            ledger,
            store,
            feedback,
            donation,
            balance,
            voting,
        }
    }
}
