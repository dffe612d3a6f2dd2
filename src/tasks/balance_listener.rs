use crate::balance::BalanceDisplay;
use crate::store::CreditSignal;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;

/// Recomputes the balance display on every credit signal and prints it when
/// the value changed.
pub async fn watch_credit_task(display: Arc<BalanceDisplay>, mut signals: Receiver<CreditSignal>) {
    info!("Balance display listening for credit updates");
    loop {
        match signals.recv().await {
            Ok(CreditSignal) => {}
            Err(RecvError::Lagged(missed)) => {
                // Signals carry no payload; one refresh covers all of them.
                warn!("Balance display skipped {} credit signal(s)", missed);
            }
            Err(RecvError::Closed) => break,
        }

        let before = display.shown();
        let now = display.refresh();
        if before != now {
            debug!("Balance changed: {:?} -> {:?}", before, now);
            if let Some(line) = display.render() {
                println!("{}", line);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{LocalWallet, WalletAdapter};
    use crate::models::{Credit, TokenAmount};
    use crate::store::CreditStore;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn display_follows_the_store() {
        let store = Arc::new(CreditStore::new("anjali-dao-donation-"));
        let wallet = Arc::new(LocalWallet::with_dev_accounts(1));
        let me = wallet.accounts()[0].clone();
        wallet.connect(&me).await.unwrap();

        let display = Arc::new(BalanceDisplay::mount(store.clone(), wallet));
        assert_eq!(display.shown(), Some(TokenAmount::ZERO));
        let task = tokio::spawn(watch_credit_task(display.clone(), store.subscribe()));

        store.set_credit(&me, Credit::whole(10));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(display.shown(), Some(TokenAmount::whole(50)));

        // Signals without a storage change leave the value where it was.
        store.notify();
        store.notify();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(display.shown(), Some(TokenAmount::whole(50)));

        task.abort();
    }
}
