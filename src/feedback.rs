use log::{debug, info, warn};
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// A transient message shown to the user until it expires.
#[derive(Debug, Clone)]
pub struct Feedback {
    pub id: Uuid,
    pub text: String,
    pub severity: Severity,
    pub expires_at: Instant,
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.severity {
            Severity::Info => "[info]",
            Severity::Success => "[ok]",
            Severity::Error => "[error]",
        };
        write!(f, "{} {}", marker, self.text)
    }
}

/// The single feedback slot shared by all panels; a newer message replaces
/// the previous one.
pub struct FeedbackBoard {
    ttl: Duration,
    current: Mutex<Option<Feedback>>,
}

impl FeedbackBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            current: Mutex::new(None),
        }
    }

    pub fn show(&self, severity: Severity, text: impl Into<String>) -> Feedback {
        let feedback = Feedback {
            id: Uuid::new_v4(),
            text: text.into(),
            severity,
            expires_at: Instant::now() + self.ttl,
        };
        match severity {
            Severity::Error => warn!("{}", feedback),
            _ => info!("{}", feedback),
        }
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(feedback.clone());
        feedback
    }

    pub fn success(&self, text: impl Into<String>) -> Feedback {
        self.show(Severity::Success, text)
    }

    pub fn error(&self, text: impl Into<String>) -> Feedback {
        self.show(Severity::Error, text)
    }

    pub fn info(&self, text: impl Into<String>) -> Feedback {
        self.show(Severity::Info, text)
    }

    /// The live message, if it has not expired yet.
    pub fn current(&self) -> Option<Feedback> {
        let now = Instant::now();
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .filter(|f| f.expires_at > now)
            .cloned()
    }

    /// Drops an expired message. Returns the id that was cleared.
    pub fn sweep(&self) -> Option<Uuid> {
        let now = Instant::now();
        let mut slot = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().is_some_and(|f| f.expires_at <= now) {
            let cleared = slot.take().map(|f| f.id);
            debug!("Cleared expired feedback {:?}", cleared);
            return cleared;
        }
        None
    }
}
