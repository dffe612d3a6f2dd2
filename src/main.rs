mod app;
mod balance;
mod chain;
mod commands;
mod config;
mod donation;
mod error;
mod feedback;
mod handlers;
mod models;
mod store;
mod tasks;
mod voting;

use app::App;
use commands::ConsoleCommand;
use config::Config;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return;
        }
    };

    let app = Arc::new(App::new(config));

    // --- Background tasks ---
    let board = Arc::clone(&app.feedback);
    tokio::spawn(async move {
        tasks::feedback_sweeper::sweep_feedback_task(board).await;
    });
    let display = Arc::clone(&app.balance);
    let signals = app.store.subscribe();
    tokio::spawn(async move {
        tasks::balance_listener::watch_credit_task(display, signals).await;
    });

    println!("{}", app.donation.render());
    println!("{}", commands::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read input: {}", e);
                break;
            }
        };

        let command = match commands::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };
        if command == ConsoleCommand::Quit {
            break;
        }

        // Votes settle in the background so the console stays usable.
        let app = Arc::clone(&app);
        tokio::spawn(async move {
            match handlers::handle_command(&app, command).await {
                Ok(output) => println!("{}", output),
                Err(e) => warn!("Command failed: {}", e),
            }
        });
    }

    app.store.end_session();
    info!("Session ended; stored credit discarded.");
}
