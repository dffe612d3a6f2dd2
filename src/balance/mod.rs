use crate::chain::WalletAdapter;
use crate::models::{Address, Credit, TokenAmount};
use crate::store::CreditStore;
use std::sync::{Arc, Mutex};

/// Display balance for an address: stored credit (zero if absent) times the rate.
pub fn compute_balance(store: &CreditStore, address: &Address) -> TokenAmount {
    store.get_credit(address).unwrap_or(Credit::ZERO).to_tokens()
}

pub struct BalanceDisplay {
    store: Arc<CreditStore>,
    wallet: Arc<dyn WalletAdapter>,
    shown: Mutex<Option<TokenAmount>>,
}

impl BalanceDisplay {
    /// Creates the display and computes the first value.
    pub fn mount(store: Arc<CreditStore>, wallet: Arc<dyn WalletAdapter>) -> Self {
        let display = Self {
            store,
            wallet,
            shown: Mutex::new(None),
        };
        display.refresh();
        display
    }

    /// Recomputes from storage. Without a connected account nothing is read
    /// and nothing is shown.
    pub fn refresh(&self) -> Option<TokenAmount> {
        let balance = self
            .wallet
            .active_address()
            .map(|address| compute_balance(&self.store, &address));
        *self.shown.lock().unwrap_or_else(|e| e.into_inner()) = balance;
        balance
    }

    pub fn shown(&self) -> Option<TokenAmount> {
        *self.shown.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn render(&self) -> Option<String> {
        self.shown().map(|balance| {
            format!(
                "Your ANJ Token Balance: {}\n  (based on your donations in the current session)",
                balance
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::LocalWallet;

    async fn connected() -> (Arc<CreditStore>, Arc<LocalWallet>, Address) {
        let store = Arc::new(CreditStore::new("anjali-dao-donation-"));
        let wallet = Arc::new(LocalWallet::with_dev_accounts(1));
        let me = wallet.accounts()[0].clone();
        wallet.connect(&me).await.unwrap();
        (store, wallet, me)
    }

    #[tokio::test]
    async fn no_credit_shows_zero() {
        let (store, wallet, _) = connected().await;
        let display = BalanceDisplay::mount(store, wallet);
        assert_eq!(display.shown(), Some(TokenAmount::ZERO));
        assert!(display.render().unwrap().contains("0 ANJ"));
    }

    #[tokio::test]
    async fn ten_credit_shows_fifty() {
        let (store, wallet, me) = connected().await;
        store.set_credit(&me, Credit::whole(10));
        let display = BalanceDisplay::mount(store, wallet);
        assert_eq!(display.shown(), Some(TokenAmount::whole(50)));
        assert!(display.render().unwrap().contains("50 ANJ"));
    }

    #[tokio::test]
    async fn refreshing_without_changes_is_stable() {
        let (store, wallet, me) = connected().await;
        store.set_credit(&me, Credit::from_micros(9_600_000).unwrap());
        let display = BalanceDisplay::mount(store, wallet);
        let first = display.refresh();
        let second = display.refresh();
        assert_eq!(first, second);
        assert_eq!(first, Some(TokenAmount::whole(48)));
    }

    #[tokio::test]
    async fn nothing_is_read_without_a_wallet() {
        let store = Arc::new(CreditStore::new("anjali-dao-donation-"));
        let wallet = Arc::new(LocalWallet::with_dev_accounts(1));
        let display = BalanceDisplay::mount(store.clone(), wallet);
        display.refresh();
        assert_eq!(display.shown(), None);
        assert!(display.render().is_none());
        assert_eq!(store.access_count(), 0);
    }
}
