use adverify_core::notify::{Notifier, NotifyOutcome};
use adverify_core::token::token_prefix;
use async_trait::async_trait;

/// Accepts every postback without sending anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, token: &str) -> NotifyOutcome {
        tracing::debug!(
            token_prefix = token_prefix(token),
            "Postback disabled, skipping"
        );
        NotifyOutcome::Delivered
    }
}
