//! Postback seam towards the external reward network.

use async_trait::async_trait;

/// How a single notification ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Delivered,
    Failed,
    TimedOut,
}

impl NotifyOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

/// Sends the confirmation for a verified token.
///
/// Implementations must bound their own runtime and must never panic on
/// delivery failure; the outcome is only ever logged.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, token: &str) -> NotifyOutcome;
}
