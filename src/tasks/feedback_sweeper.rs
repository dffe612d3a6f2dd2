use crate::feedback::FeedbackBoard;
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

const SWEEP_INTERVAL_MS: u64 = 250;

pub async fn sweep_feedback_task(board: Arc<FeedbackBoard>) {
    info!("Starting background task to clear expired feedback...");
    let mut interval = interval(Duration::from_millis(SWEEP_INTERVAL_MS));

    loop {
        interval.tick().await;
        if let Some(id) = board.sweep() {
            debug!("Feedback {} expired", id);
        }
    }
}
