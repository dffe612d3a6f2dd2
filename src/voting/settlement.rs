use crate::error::SettlementError;
use crate::models::Poll;
use async_trait::async_trait;
use log::debug;
use std::time::Duration;

/// Stand-in for the asynchronous work a vote would need before it counts.
#[async_trait]
pub trait Settlement: Send + Sync {
    async fn settle(&self, poll: &Poll) -> Result<(), SettlementError>;
}

/// Settles every vote after a fixed delay.
pub struct DelayedSettlement {
    delay: Duration,
}

impl DelayedSettlement {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Settlement for DelayedSettlement {
    async fn settle(&self, poll: &Poll) -> Result<(), SettlementError> {
        debug!("Settling vote on poll {} in {:?}", poll.id, self.delay);
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}
