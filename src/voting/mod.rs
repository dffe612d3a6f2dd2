mod settlement;

pub use settlement::{DelayedSettlement, Settlement};

use crate::balance::compute_balance;
use crate::chain::WalletAdapter;
use crate::error::VoteError;
use crate::feedback::FeedbackBoard;
use crate::models::{Poll, TokenAmount};
use crate::store::CreditStore;
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Where one poll stands for the current user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollPhase {
    Unselected,
    Selected(String),
    Submitting(String),
    Settled(String),
}

#[derive(Debug, Clone)]
pub struct VoteReceipt {
    pub poll_id: u32,
    pub option: String,
    pub cost: TokenAmount,
    pub remaining: TokenAmount,
    pub cast_at: DateTime<Utc>,
}

pub struct VotingPanel {
    polls: Vec<Poll>,
    phases: Mutex<HashMap<u32, PollPhase>>,
    store: Arc<CreditStore>,
    wallet: Arc<dyn WalletAdapter>,
    feedback: Arc<FeedbackBoard>,
    settlement: Arc<dyn Settlement>,
}

impl VotingPanel {
    pub fn new(
        polls: Vec<Poll>,
        store: Arc<CreditStore>,
        wallet: Arc<dyn WalletAdapter>,
        feedback: Arc<FeedbackBoard>,
        settlement: Arc<dyn Settlement>,
    ) -> Self {
        Self {
            polls,
            phases: Mutex::new(HashMap::new()),
            store,
            wallet,
            feedback,
            settlement,
        }
    }

    pub fn polls(&self) -> &[Poll] {
        &self.polls
    }

    pub fn poll(&self, poll_id: u32) -> Option<&Poll> {
        self.polls.iter().find(|p| p.id == poll_id)
    }

    pub fn phase(&self, poll_id: u32) -> PollPhase {
        self.phases
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&poll_id)
            .cloned()
            .unwrap_or(PollPhase::Unselected)
    }

    fn set_phase(&self, poll_id: u32, phase: PollPhase) {
        self.phases
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(poll_id, phase);
    }

    /// Current balance, or None when no wallet is connected (storage untouched).
    pub fn balance(&self) -> Option<TokenAmount> {
        self.wallet
            .active_address()
            .map(|address| compute_balance(&self.store, &address))
    }

    pub fn select(&self, poll_id: u32, option: &str) -> Result<(), VoteError> {
        let poll = self.poll(poll_id).ok_or(VoteError::UnknownPoll(poll_id))?;
        if !poll.has_option(option) {
            return Err(VoteError::UnknownOption {
                poll_id,
                option: option.to_string(),
            });
        }

        let mut phases = self.phases.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(PollPhase::Submitting(_)) = phases.get(&poll_id) {
            return Err(VoteError::AlreadySubmitting);
        }
        phases.insert(poll_id, PollPhase::Selected(option.to_string()));
        Ok(())
    }

    /// Whether the vote button for a poll is enabled.
    pub fn can_vote(&self, poll_id: u32) -> bool {
        let Some(poll) = self.poll(poll_id) else {
            return false;
        };
        if self.wallet.active_address().is_none() {
            return false;
        }
        match self.phase(poll_id) {
            PollPhase::Selected(_) | PollPhase::Settled(_) => {}
            PollPhase::Unselected | PollPhase::Submitting(_) => return false,
        }
        self.balance().is_some_and(|b| b >= poll.cost_tokens())
    }

    /// Casts a vote: checks, settles, then spends the poll cost from the credit.
    pub async fn vote(&self, poll_id: u32) -> Result<VoteReceipt, VoteError> {
        let result = self.try_vote(poll_id).await;
        match &result {
            Ok(receipt) => {
                info!(
                    "Vote on poll {} for {:?} settled at {}; {} left",
                    receipt.poll_id,
                    receipt.option,
                    receipt.cast_at.format("%H:%M:%S"),
                    receipt.remaining
                );
                self.feedback
                    .success(format!("Vote cast! {} has been used.", receipt.cost));
            }
            Err(e) => {
                self.feedback.error(format!("Cannot vote: {}", e));
            }
        }
        result
    }

    async fn try_vote(&self, poll_id: u32) -> Result<VoteReceipt, VoteError> {
        let poll = self.poll(poll_id).ok_or(VoteError::UnknownPoll(poll_id))?;
        let address = self.wallet.active_address().ok_or(VoteError::NotConnected)?;
        let cost = poll.cost_tokens();

        // Claim the poll before the first await so it cannot be submitted twice.
        let option = {
            let mut phases = self.phases.lock().unwrap_or_else(|e| e.into_inner());
            let option = match phases.get(&poll_id) {
                Some(PollPhase::Submitting(_)) => return Err(VoteError::AlreadySubmitting),
                Some(PollPhase::Selected(o)) | Some(PollPhase::Settled(o)) => o.clone(),
                Some(PollPhase::Unselected) | None => return Err(VoteError::NoSelection),
            };
            let balance = compute_balance(&self.store, &address);
            if balance < cost {
                return Err(VoteError::InsufficientBalance { balance, cost });
            }
            phases.insert(poll_id, PollPhase::Submitting(option.clone()));
            option
        };
        info!("Casting vote on poll {} for {:?} ({})", poll_id, option, cost);

        if let Err(e) = self.settlement.settle(poll).await {
            self.set_phase(poll_id, PollPhase::Selected(option));
            return Err(e.into());
        }

        // Re-checked against the stored credit: another poll may have spent it
        // while this one was settling.
        let credit = match self.store.spend_tokens(&address, cost) {
            Ok(credit) => credit,
            Err(e) => {
                warn!("Vote on poll {} lost its balance during settlement", poll_id);
                self.set_phase(poll_id, PollPhase::Selected(option));
                return Err(e);
            }
        };
        self.set_phase(poll_id, PollPhase::Settled(option.clone()));

        Ok(VoteReceipt {
            poll_id,
            option,
            cost,
            remaining: credit.to_tokens(),
            cast_at: Utc::now(),
        })
    }

    pub fn render(&self) -> String {
        let mut out = String::from("Community Proposals\n");
        for poll in &self.polls {
            let phase = self.phase(poll.id);
            out.push_str(&format!(
                "\n[{}] {}\n    Requires: {} | {}\n",
                poll.id,
                poll.question,
                poll.cost_tokens(),
                poll.deadline
            ));
            for (i, option) in poll.options.iter().enumerate() {
                let chosen = matches!(
                    &phase,
                    PollPhase::Selected(o) | PollPhase::Submitting(o) | PollPhase::Settled(o) if o == option
                );
                out.push_str(&format!(
                    "    ({}) {} {}\n",
                    if chosen { "x" } else { " " },
                    i + 1,
                    option
                ));
            }
            let button = match phase {
                PollPhase::Submitting(_) => "Casting Vote...",
                _ if self.can_vote(poll.id) => "Vote Now",
                _ => "Vote Now (disabled)",
            };
            out.push_str(&format!("    {}\n", button));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::LocalWallet;
    use crate::error::SettlementError;
    use crate::models::{Address, Credit, community_polls};
    use async_trait::async_trait;
    use std::time::Duration;

    struct Immediate;

    #[async_trait]
    impl Settlement for Immediate {
        async fn settle(&self, _poll: &Poll) -> Result<(), SettlementError> {
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Settlement for Failing {
        async fn settle(&self, _poll: &Poll) -> Result<(), SettlementError> {
            Err(SettlementError::Failed("node unavailable".to_string()))
        }
    }

    struct Fixture {
        panel: VotingPanel,
        store: Arc<CreditStore>,
        feedback: Arc<FeedbackBoard>,
        me: Address,
    }

    async fn fixture(settlement: Arc<dyn Settlement>, credit: Option<u64>) -> Fixture {
        let store = Arc::new(CreditStore::new("anjali-dao-donation-"));
        let wallet = Arc::new(LocalWallet::with_dev_accounts(1));
        let me = wallet.accounts()[0].clone();
        wallet.connect(&me).await.unwrap();
        if let Some(units) = credit {
            store.set_credit(&me, Credit::whole(units));
        }
        let feedback = Arc::new(FeedbackBoard::new(Duration::from_secs(4)));
        let panel = VotingPanel::new(
            community_polls(),
            store.clone(),
            wallet,
            feedback.clone(),
            settlement,
        );
        Fixture {
            panel,
            store,
            feedback,
            me,
        }
    }

    #[tokio::test]
    async fn spending_five_of_fifty_leaves_forty_five() {
        let f = fixture(Arc::new(Immediate), Some(10)).await;
        f.panel.select(2, "Global Health Org").unwrap();
        assert!(f.panel.can_vote(2));

        let receipt = f.panel.vote(2).await.unwrap();
        assert_eq!((receipt.poll_id, receipt.option.as_str()), (2, "Global Health Org"));
        assert!(receipt.cast_at <= Utc::now());
        assert_eq!(receipt.remaining, TokenAmount::whole(45));
        assert_eq!(f.store.get_credit(&f.me).unwrap().to_string(), "9");
        assert_eq!(f.panel.balance(), Some(TokenAmount::whole(45)));
        assert_eq!(f.panel.phase(2), PollPhase::Settled("Global Health Org".to_string()));
        assert!(f.feedback.current().unwrap().text.contains("5 ANJ has been used"));
    }

    #[tokio::test]
    async fn repeated_votes_subtract_exactly() {
        let f = fixture(Arc::new(Immediate), Some(10)).await;
        f.panel.select(1, "Modern Tech Fair").unwrap();
        for _ in 0..10 {
            f.panel.vote(1).await.unwrap();
        }
        assert_eq!(f.panel.balance(), Some(TokenAmount::whole(30)));
    }

    #[tokio::test]
    async fn vote_needs_a_selection() {
        let f = fixture(Arc::new(Immediate), Some(10)).await;
        assert!(!f.panel.can_vote(1));
        assert!(matches!(f.panel.vote(1).await, Err(VoteError::NoSelection)));
        assert_eq!(f.store.get_credit(&f.me), Some(Credit::whole(10)));
    }

    #[tokio::test]
    async fn insufficient_balance_is_rejected_for_every_poll() {
        for credit in [None, Some(0)] {
            let f = fixture(Arc::new(Immediate), credit).await;
            for poll in community_polls() {
                f.panel.select(poll.id, &poll.options[0]).unwrap();
                assert!(!f.panel.can_vote(poll.id));
                let err = f.panel.vote(poll.id).await.unwrap_err();
                assert!(matches!(err, VoteError::InsufficientBalance { .. }));
                assert_eq!(f.panel.phase(poll.id), PollPhase::Selected(poll.options[0].clone()));
            }
            assert_eq!(f.store.get_credit(&f.me), credit.map(Credit::whole));
        }
    }

    #[tokio::test]
    async fn one_unit_short_is_still_rejected() {
        // 4 ANJ against a cost of 5.
        let f = fixture(Arc::new(Immediate), None).await;
        f.store.set_credit(&f.me, Credit::from_micros(800_000).unwrap());
        f.panel.select(2, "Animal Welfare Shelter").unwrap();
        assert!(!f.panel.can_vote(2));
        assert!(f.panel.vote(2).await.is_err());
        assert_eq!(f.store.get_credit(&f.me), Some(Credit::from_micros(800_000).unwrap()));
    }

    #[tokio::test]
    async fn disconnected_wallet_disables_voting_without_touching_storage() {
        let store = Arc::new(CreditStore::new("anjali-dao-donation-"));
        let panel = VotingPanel::new(
            community_polls(),
            store.clone(),
            Arc::new(LocalWallet::with_dev_accounts(1)),
            Arc::new(FeedbackBoard::new(Duration::from_secs(4))),
            Arc::new(Immediate),
        );
        panel.select(1, "Cultural Heritage").unwrap();
        assert!(!panel.can_vote(1));
        assert!(matches!(panel.vote(1).await, Err(VoteError::NotConnected)));
        assert!(panel.render().contains("Vote Now (disabled)"));
        assert_eq!(store.access_count(), 0);
    }

    #[tokio::test]
    async fn unknown_polls_and_options_are_refused() {
        let f = fixture(Arc::new(Immediate), Some(10)).await;
        assert!(matches!(f.panel.select(9, "x"), Err(VoteError::UnknownPoll(9))));
        assert!(matches!(
            f.panel.select(1, "Not an option"),
            Err(VoteError::UnknownOption { .. })
        ));
    }

    #[tokio::test]
    async fn failed_settlement_keeps_the_credit() {
        let f = fixture(Arc::new(Failing), Some(10)).await;
        f.panel.select(1, "Cultural Heritage").unwrap();
        assert!(matches!(f.panel.vote(1).await, Err(VoteError::Settlement(_))));
        assert_eq!(f.store.get_credit(&f.me), Some(Credit::whole(10)));
        assert_eq!(f.panel.phase(1), PollPhase::Selected("Cultural Heritage".to_string()));
        assert!(f.feedback.current().unwrap().text.contains("node unavailable"));
    }

    #[tokio::test(start_paused = true)]
    async fn same_poll_cannot_be_submitted_twice() {
        let settlement = Arc::new(DelayedSettlement::new(Duration::from_millis(1500)));
        let f = fixture(settlement, Some(10)).await;
        f.panel.select(1, "Cultural Heritage").unwrap();

        let (first, second) = tokio::join!(f.panel.vote(1), f.panel.vote(1));
        assert!(first.is_ok());
        assert!(matches!(second, Err(VoteError::AlreadySubmitting)));
        assert_eq!(f.panel.balance(), Some(TokenAmount::whole(48)));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_polls_cannot_overspend() {
        let settlement = Arc::new(DelayedSettlement::new(Duration::from_millis(1500)));
        // 5 ANJ: enough for either poll alone, not both.
        let f = fixture(settlement, Some(1)).await;
        f.panel.select(1, "Cultural Heritage").unwrap();
        f.panel.select(2, "Local Education Fund").unwrap();
        assert!(f.panel.can_vote(1) && f.panel.can_vote(2));

        let (a, b) = tokio::join!(f.panel.vote(1), f.panel.vote(2));
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let left = f.panel.balance().unwrap();
        assert!(left == TokenAmount::whole(3) || left == TokenAmount::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn submitting_blocks_reselection() {
        let settlement = Arc::new(DelayedSettlement::new(Duration::from_millis(1500)));
        let f = fixture(settlement, Some(10)).await;
        f.panel.select(1, "Cultural Heritage").unwrap();

        let vote = f.panel.vote(1);
        let probe = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let during = f.panel.select(1, "Modern Tech Fair");
            (during, f.panel.render())
        };
        let (result, (during, rendered)) = tokio::join!(vote, probe);
        assert!(result.is_ok());
        assert!(matches!(during, Err(VoteError::AlreadySubmitting)));
        assert!(rendered.contains("Casting Vote..."));
    }
}
