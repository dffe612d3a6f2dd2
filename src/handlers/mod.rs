use crate::app::App;
use crate::chain::WalletAdapter;
use crate::commands::{ConsoleCommand, HELP};
use log::info;
use std::fmt::Write as _;

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Runs one console command against the session and returns what to print.
/// Failures of user actions are reported through the feedback board and the
/// returned text; only broken plumbing comes back as `Err`.
pub async fn handle_command(app: &App, command: ConsoleCommand) -> Result<String, HandlerError> {
    info!("Received command: {:?}", command);
    let output = match command {
        ConsoleCommand::Help => HELP.to_string(),
        ConsoleCommand::Connect(None) => {
            app.donation.toggle_wallet_overlay();
            app.donation.render()
        }
        ConsoleCommand::Connect(Some(n)) => {
            let accounts = app.wallet.accounts();
            let Some(address) = n.checked_sub(1).and_then(|i| accounts.get(i)) else {
                return Ok(format!(
                    "No wallet account {} (there are {}).",
                    n,
                    accounts.len()
                ));
            };
            app.donation.connect(address).await?;
            app.feedback.info(format!("Connected {}", address.short()));
            app.donation.render()
        }
        ConsoleCommand::Disconnect => {
            app.donation.disconnect().await;
            app.feedback.info("Wallet disconnected.");
            app.donation.render()
        }
        ConsoleCommand::Amount(input) => {
            app.donation.set_amount(&input);
            app.donation.render()
        }
        ConsoleCommand::OptIn => {
            // Outcome already lands on the feedback board.
            let _ = app.donation.opt_in().await;
            with_feedback(app, app.donation.render())
        }
        ConsoleCommand::Donate => {
            let _ = app.donation.donate().await;
            with_feedback(app, app.donation.render())
        }
        ConsoleCommand::Polls => app.voting.render(),
        ConsoleCommand::Select { poll_id, option } => {
            let Some(poll) = app.voting.poll(poll_id) else {
                return Ok(format!("No poll {}.", poll_id));
            };
            let Some(choice) = poll.option_at(option) else {
                return Ok(format!("Poll {} has no option {}.", poll_id, option));
            };
            match app.voting.select(poll_id, choice) {
                Ok(()) => app.voting.render(),
                Err(e) => format!("Cannot select: {}", e),
            }
        }
        ConsoleCommand::Vote(poll_id) => {
            let _ = app.voting.vote(poll_id).await;
            with_feedback(app, app.voting.render())
        }
        ConsoleCommand::Balance => {
            app.balance.refresh();
            app.balance
                .render()
                .unwrap_or_else(|| "Connect a wallet to see your ANJ balance.".to_string())
        }
        ConsoleCommand::Status => status(app)?,
        ConsoleCommand::Quit => "Goodbye.".to_string(),
    };
    Ok(output)
}

fn with_feedback(app: &App, body: String) -> String {
    match app.feedback.current() {
        Some(feedback) => format!("{}\n{}", feedback, body),
        None => body,
    }
}

fn status(app: &App) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    match app.donation.account() {
        Some(address) => {
            writeln!(out, "Account:        {}", address)?;
            writeln!(out, "ALGO balance:   {}", app.ledger.algo_balance(&address))?;
            match app.ledger.token_holding(&address) {
                Some(units) => writeln!(out, "ANJ holding:    {} (on ledger, base units)", units)?,
                None => writeln!(out, "ANJ holding:    not opted in")?,
            }
        }
        None => writeln!(out, "Account:        not connected")?,
    }
    writeln!(out, "App:            {} at {}", app.config.app_id, app.ledger.app_address())?;
    writeln!(
        out,
        "Ledger round:   {} ({} confirmed txn(s))",
        app.ledger.round(),
        app.ledger.confirmed_count()
    )?;
    writeln!(out, "Session keys:   {}", app.store.entry_count())?;
    writeln!(
        out,
        "Donate button:  {}",
        if app.donation.can_donate() { "enabled" } else { "disabled" }
    )?;
    writeln!(
        out,
        "Wallet overlay: {}",
        if app.donation.overlay_open() { "open" } else { "closed" }
    )?;
    if let Some(feedback) = app.feedback.current() {
        writeln!(out, "Last message:   {}", feedback)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::SettlementError;
    use crate::models::Poll;
    use crate::voting::Settlement;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Immediate;

    #[async_trait]
    impl Settlement for Immediate {
        async fn settle(&self, _poll: &Poll) -> Result<(), SettlementError> {
            Ok(())
        }
    }

    fn app() -> App {
        let config = Config::from_lookup(|_: &str| None).unwrap();
        App::with_settlement(config, Arc::new(Immediate))
    }

    async fn run(app: &App, line: &str) -> String {
        let command = crate::commands::parse(line).unwrap().unwrap();
        handle_command(app, command).await.unwrap()
    }

    #[tokio::test]
    async fn donate_then_vote_through_the_console() {
        let app = app();
        assert!(run(&app, "connect").await.contains("Select a wallet account"));
        assert!(run(&app, "connect 1").await.contains("Connected:"));
        assert!(!app.donation.overlay_open());

        assert!(run(&app, "optin").await.contains("Opted in to ANJ."));
        run(&app, "amount 2").await;
        assert!(run(&app, "donate").await.contains("Donation of 2 ALGO successful."));
        // 2 ALGO buys 20 ANJ on the ledger and the display agrees.
        assert!(run(&app, "balance").await.contains("Balance: 20 ANJ"));
        let status = run(&app, "status").await;
        assert!(status.contains("ANJ holding:    20"));

        run(&app, "select 2 1").await;
        assert!(run(&app, "vote 2").await.contains("Vote cast! 5 ANJ has been used."));
        assert!(run(&app, "balance").await.contains("Balance: 15 ANJ"));

        let status = run(&app, "status").await;
        assert!(status.contains("Session keys:   1"));
        assert!(status.contains("confirmed txn(s)"));
    }

    #[tokio::test]
    async fn actions_without_a_wallet_report_errors() {
        let app = app();
        assert!(run(&app, "balance").await.contains("Connect a wallet"));
        assert!(run(&app, "donate").await.contains("Please connect your wallet first."));
        assert!(run(&app, "connect 9").await.contains("No wallet account 9"));
        assert!(run(&app, "select 7 1").await.contains("No poll 7"));
        assert!(run(&app, "select 1 9").await.contains("has no option 9"));
        assert!(run(&app, "status").await.contains("not connected"));
    }
}
