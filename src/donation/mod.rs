use crate::chain::{
    AppCallParams, AssetOptInParams, LedgerClient, PaymentParams, TxId, WalletAdapter,
    abi_selector,
};
use crate::config::Config;
use crate::error::{AmountError, DonationError, LedgerError, WalletError};
use crate::feedback::FeedbackBoard;
use crate::models::{Address, MicroAlgos, TokenAmount};
use crate::store::CreditStore;
use chrono::{DateTime, Utc};
use log::{error, info};
use std::sync::{Arc, Mutex};

const DONATE_METHOD: &str = "donate()void";

#[derive(Debug, Clone)]
pub struct DonationReceipt {
    pub txid: TxId,
    pub amount: MicroAlgos,
    /// ANJ the application handed back.
    pub received: TokenAmount,
    pub round: u64,
    pub confirmed_at: DateTime<Utc>,
}

#[derive(Default)]
struct PanelState {
    overlay_open: bool,
    amount_input: String,
    account: Option<Address>,
    processing: bool,
}

/// Clears the processing flag however the action ends.
struct Processing<'a> {
    state: &'a Mutex<PanelState>,
}

impl Drop for Processing<'_> {
    fn drop(&mut self) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).processing = false;
    }
}

pub struct DonationPanel {
    app_id: u64,
    asset_id: u64,
    confirm_rounds: u64,
    wallet: Arc<dyn WalletAdapter>,
    ledger: Arc<dyn LedgerClient>,
    store: Arc<CreditStore>,
    feedback: Arc<FeedbackBoard>,
    state: Mutex<PanelState>,
}

impl DonationPanel {
    pub fn new(
        config: &Config,
        wallet: Arc<dyn WalletAdapter>,
        ledger: Arc<dyn LedgerClient>,
        store: Arc<CreditStore>,
        feedback: Arc<FeedbackBoard>,
    ) -> Self {
        let panel = Self {
            app_id: config.app_id,
            asset_id: config.asset_id,
            confirm_rounds: config.confirm_rounds,
            wallet,
            ledger,
            store,
            feedback,
            state: Mutex::new(PanelState::default()),
        };
        panel.state().account = panel.wallet.active_address();
        panel
    }

    fn state(&self) -> std::sync::MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Opens or closes the wallet-selection overlay; returns whether it is open.
    pub fn toggle_wallet_overlay(&self) -> bool {
        let mut state = self.state();
        state.overlay_open = !state.overlay_open;
        state.overlay_open
    }

    pub fn overlay_open(&self) -> bool {
        self.state().overlay_open
    }

    pub async fn connect(&self, address: &Address) -> Result<(), WalletError> {
        let result = self.wallet.connect(address).await;
        if result.is_ok() {
            self.state().overlay_open = false;
        }
        self.resync();
        result
    }

    pub async fn disconnect(&self) {
        self.wallet.disconnect().await;
        self.resync();
    }

    pub fn account(&self) -> Option<Address> {
        self.state().account.clone()
    }

    pub fn set_amount(&self, input: &str) {
        self.state().amount_input = input.trim().to_string();
    }

    /// The typed amount, if it parses.
    pub fn amount(&self) -> Option<MicroAlgos> {
        self.state().amount_input.parse().ok()
    }

    pub fn is_processing(&self) -> bool {
        self.state().processing
    }

    /// Whether the donate button is enabled.
    pub fn can_donate(&self) -> bool {
        self.account().is_some()
            && !self.is_processing()
            && self.amount().is_some_and(|a| !a.is_zero())
    }

    fn begin(&self) -> Result<Processing<'_>, DonationError> {
        let mut state = self.state();
        if state.processing {
            return Err(DonationError::Busy);
        }
        state.processing = true;
        Ok(Processing { state: &self.state })
    }

    /// Re-reads the wallet into the panel and tells listeners to recompute.
    /// Runs after every transaction outcome.
    pub fn resync(&self) {
        let active = self.wallet.active_address();
        {
            let mut state = self.state();
            if state.account != active {
                state.amount_input.clear();
                state.account = active;
            }
        }
        self.store.notify();
    }

    pub async fn opt_in(&self) -> Result<TxId, DonationError> {
        let result = self.try_opt_in().await;
        match &result {
            Ok(txid) => {
                info!("Opt-in confirmed: {}", txid);
                self.feedback.success("Opted in to ANJ.");
            }
            Err(e @ (DonationError::NotConnected | DonationError::Busy)) => {
                self.feedback.error(e.to_string());
            }
            Err(e) => {
                error!("Opt-in error: {}", e);
                self.feedback.error(format!("Opt-in failed: {}", e));
            }
        }
        self.resync();
        result
    }

    async fn try_opt_in(&self) -> Result<TxId, DonationError> {
        let sender = self.wallet.active_address().ok_or(DonationError::NotConnected)?;
        let _processing = self.begin()?;

        let params = self.ledger.suggested_params().await?;
        let txn = self.ledger.build_asset_opt_in(AssetOptInParams {
            sender,
            asset_id: self.asset_id,
            params,
        });
        let signed = self.wallet.sign(&[txn], &[0]).await?;
        let txid = self.ledger.submit_raw(signed).await?;
        self.ledger
            .wait_for_confirmation(&txid, self.confirm_rounds)
            .await?;
        Ok(txid)
    }

    pub async fn donate(&self) -> Result<DonationReceipt, DonationError> {
        let result = self.try_donate().await;
        match &result {
            Ok(receipt) => {
                info!(
                    "Donation {} confirmed in round {} at {}, received {}",
                    receipt.txid,
                    receipt.round,
                    receipt.confirmed_at.format("%H:%M:%S"),
                    receipt.received
                );
                self.feedback
                    .success(format!("Donation of {} successful.", receipt.amount));
                // Input typed while the donation was in flight is kept.
                let mut state = self.state();
                if state.amount_input.parse::<MicroAlgos>().ok() == Some(receipt.amount) {
                    state.amount_input.clear();
                }
            }
            Err(
                e @ (DonationError::NotConnected
                | DonationError::InvalidAmount
                | DonationError::Busy),
            ) => {
                self.feedback.error(e.to_string());
            }
            Err(e) => {
                error!("Donation error: {}", e);
                self.feedback.error(format!("Donation failed: {}", e));
            }
        }
        self.resync();
        result
    }

    async fn try_donate(&self) -> Result<DonationReceipt, DonationError> {
        let sender = self.wallet.active_address().ok_or(DonationError::NotConnected)?;
        let amount = self
            .amount()
            .filter(|a| !a.is_zero())
            .ok_or(DonationError::InvalidAmount)?;
        let _processing = self.begin()?;

        let params = self.ledger.suggested_params().await?;
        let payment = self.ledger.build_payment(PaymentParams {
            sender: sender.clone(),
            receiver: Address::for_application(self.app_id),
            amount,
            params: params.clone(),
        });
        let call = self.ledger.build_app_call(AppCallParams {
            sender: sender.clone(),
            app_id: self.app_id,
            args: vec![abi_selector(DONATE_METHOD).to_vec()],
            foreign_assets: vec![self.asset_id],
            params,
        });

        // Payment and app call succeed or fail together.
        let mut group = vec![payment, call];
        self.ledger.assign_group(&mut group)?;
        let call_id = group[1].id().map_err(LedgerError::from)?;
        let signed = self.wallet.sign(&group, &[0, 1]).await?;
        let txid = self.ledger.submit_raw(signed).await?;
        // The token hand-back is an inner transfer of the app call.
        let confirmation = self
            .ledger
            .wait_for_confirmation(&call_id, self.confirm_rounds)
            .await?;

        let received = confirmation
            .asset_received(&sender, self.asset_id)
            .and_then(TokenAmount::checked_whole)
            .ok_or_else(|| AmountError::Overflow("ANJ received".to_string()))?;
        self.store.record_donation(&sender, received)?;
        Ok(DonationReceipt {
            txid,
            amount,
            received,
            round: confirmation.round,
            confirmed_at: confirmation.confirmed_at,
        })
    }

    pub fn render(&self) -> String {
        let state = self.state();
        let mut out = String::from("Welcome to the Onjoli Dan\nDonate ALGO to participate in the festival and receive ANJ tokens.\n");
        match &state.account {
            None => out.push_str("  [Connect Wallet (Testnet)]\n"),
            Some(address) => {
                out.push_str(&format!("  Connected: {}\n", address.short()));
                let amount = state.amount_input.parse::<MicroAlgos>().ok().filter(|a| !a.is_zero());
                out.push_str(&format!(
                    "  Amount: {}\n",
                    if state.amount_input.is_empty() { "(empty)" } else { state.amount_input.as_str() }
                ));
                out.push_str("  [Opt-In to ANJ]  ");
                match (state.processing, amount) {
                    (true, _) => out.push_str("[Processing...]\n"),
                    (false, Some(a)) => out.push_str(&format!("[Donate {}]\n", a)),
                    (false, None) => out.push_str("[Donate] (disabled)\n"),
                }
            }
        }
        if state.overlay_open {
            out.push_str("  Select a wallet account (connect <n>):\n");
            for (i, account) in self.wallet.accounts().iter().enumerate() {
                out.push_str(&format!("    {}. {}\n", i + 1, account));
            }
        }
        out
    }
}
