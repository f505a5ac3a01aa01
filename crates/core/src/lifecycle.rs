//! Token lifecycle manager.
//!
//! [`TokenLifecycle`] mints tokens, reports their status and performs the
//! single pending -> verified transition. Once the transition has been
//! committed by the [`TokenStore`], the postback is handed to a detached task
//! tracked by a [`TaskTracker`]; its outcome never reaches the caller.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::task::TaskTracker;

use crate::error::CoreError;
use crate::gate::AccessGate;
use crate::notify::{Notifier, NotifyOutcome};
use crate::store::{InsertOutcome, TokenStore};
use crate::token::{generate_token, token_prefix, NewToken, TaskPayload, TokenKind, TokenRecord};
use crate::types::{Timestamp, UserId};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// How many fresh tokens are drawn before `create_token` gives up on collisions.
pub const MAX_GENERATION_ATTEMPTS: usize = 8;

/// Default client-side countdown on the confirmation page, in seconds.
pub const DEFAULT_CLIENT_DWELL_SECS: u32 = 8;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Which token kinds trigger a postback once verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyOn {
    /// Only advertisement views are reported to the ad network.
    #[default]
    AdOnly,
    All,
}

impl NotifyOn {
    pub fn applies_to(self, kind: TokenKind) -> bool {
        match self {
            Self::AdOnly => kind == TokenKind::Ad,
            Self::All => true,
        }
    }
}

impl FromStr for NotifyOn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ad" | "ad_only" => Ok(Self::AdOnly),
            "all" => Ok(Self::All),
            other => Err(format!("unknown postback mode '{other}' (expected 'ad' or 'all')")),
        }
    }
}

/// Product-policy switches shared by every deployment variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecyclePolicy {
    /// Whether completing a token requires the bot secret.
    pub require_secret_on_complete: bool,
    /// Countdown shown by the confirmation page. Not enforced server-side.
    pub client_dwell_secs: u32,
    /// Kinds that post back on completion. Under the default
    /// ([`NotifyOn::AdOnly`]) task completions skip the notifier entirely.
    pub notify_on: NotifyOn,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            require_secret_on_complete: false,
            client_dwell_secs: DEFAULT_CLIENT_DWELL_SECS,
            notify_on: NotifyOn::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// What the caller needs to credit the user after a successful completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub token: String,
    pub user_id: UserId,
    pub kind: TokenKind,
    pub task: Option<TaskPayload>,
    pub verified_at: Timestamp,
}

// ---------------------------------------------------------------------------
// TokenLifecycle
// ---------------------------------------------------------------------------

pub struct TokenLifecycle {
    store: Arc<dyn TokenStore>,
    notifier: Arc<dyn Notifier>,
    gate: AccessGate,
    policy: LifecyclePolicy,
    postbacks: TaskTracker,
    generate: fn() -> String,
}

impl TokenLifecycle {
    pub fn new(
        store: Arc<dyn TokenStore>,
        notifier: Arc<dyn Notifier>,
        gate: AccessGate,
        policy: LifecyclePolicy,
    ) -> Self {
        Self {
            store,
            notifier,
            gate,
            policy,
            postbacks: TaskTracker::new(),
            generate: generate_token,
        }
    }

    /// Replace the token generator. Used to exercise collision handling.
    pub fn with_token_generator(mut self, generate: fn() -> String) -> Self {
        self.generate = generate;
        self
    }

    pub fn policy(&self) -> &LifecyclePolicy {
        &self.policy
    }

    /// Gate for create and status calls.
    pub fn authorize(&self, secret: Option<&str>) -> Result<(), CoreError> {
        self.gate.check(secret)
    }

    /// Gate for completion; a no-op unless the policy requires the secret.
    pub fn authorize_complete(&self, secret: Option<&str>) -> Result<(), CoreError> {
        if self.policy.require_secret_on_complete {
            self.gate.check(secret)
        } else {
            Ok(())
        }
    }

    /// Mint and store a new pending token.
    ///
    /// Generation is retried on collision; an existing record is never
    /// overwritten.
    pub async fn create_token(&self, new: NewToken) -> Result<TokenRecord, CoreError> {
        new.validate()?;

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let record = TokenRecord::pending((self.generate)(), new.clone(), Utc::now());
            match self.store.insert(record.clone()).await? {
                InsertOutcome::Inserted => {
                    tracing::info!(
                        token_prefix = token_prefix(&record.token),
                        user_id = record.user_id,
                        kind = %record.kind,
                        "Token created",
                    );
                    return Ok(record);
                }
                InsertOutcome::Collision => {
                    tracing::warn!(attempt, "Generated token already exists, regenerating");
                }
            }
        }

        Err(CoreError::Internal(format!(
            "could not generate a unique token after {MAX_GENERATION_ATTEMPTS} attempts"
        )))
    }

    /// Current record for `token`.
    pub async fn get_status(&self, token: &str) -> Result<TokenRecord, CoreError> {
        self.store.get(token).await?.ok_or(CoreError::TokenNotFound)
    }

    /// Verify `token` at most once and schedule the postback.
    pub async fn complete_token(&self, token: &str) -> Result<Completion, CoreError> {
        let record = match self.store.mark_verified(token, Utc::now()).await {
            Ok(record) => record,
            Err(err) => {
                tracing::info!(
                    token_prefix = token_prefix(token),
                    error = %err,
                    "Token completion rejected",
                );
                return Err(err);
            }
        };

        let verified_at = record.verified_at().ok_or_else(|| {
            CoreError::Internal("store returned an unverified record after completion".into())
        })?;

        tracing::info!(
            token_prefix = token_prefix(&record.token),
            user_id = record.user_id,
            kind = %record.kind,
            "Token verified",
        );

        if self.policy.notify_on.applies_to(record.kind) {
            self.dispatch_postback(record.token.clone());
        }

        Ok(Completion {
            token: record.token,
            user_id: record.user_id,
            kind: record.kind,
            task: record.task,
            verified_at,
        })
    }

    /// Number of stored tokens.
    pub async fn token_count(&self) -> Result<usize, CoreError> {
        self.store.count().await
    }

    /// Postbacks that have been dispatched but not finished yet.
    pub fn in_flight_postbacks(&self) -> usize {
        self.postbacks.len()
    }

    /// Wait up to `timeout` for in-flight postbacks.
    ///
    /// Returns `false` if some were still running when the timeout expired.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.postbacks.close();
        let pending = self.postbacks.len();
        if tokio::time::timeout(timeout, self.postbacks.wait())
            .await
            .is_ok()
        {
            true
        } else {
            tracing::warn!(pending, "Postbacks still in flight at shutdown");
            false
        }
    }

    fn dispatch_postback(&self, token: String) {
        let notifier = Arc::clone(&self.notifier);
        self.postbacks.spawn(async move {
            let outcome = notifier.notify(&token).await;
            match outcome {
                NotifyOutcome::Delivered => {
                    tracing::debug!(token_prefix = token_prefix(&token), "Postback delivered");
                }
                NotifyOutcome::Failed | NotifyOutcome::TimedOut => {
                    tracing::warn!(
                        token_prefix = token_prefix(&token),
                        outcome = outcome.as_str(),
                        "Postback not delivered; verification stands",
                    );
                }
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
