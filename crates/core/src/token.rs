//! Token records and token generation.
//!
//! A [`TokenRecord`] is created in the [`TokenState::Pending`] state and can
//! move to [`TokenState::Verified`] exactly once via
//! [`TokenRecord::mark_verified`]. `state` and `verified_at` are private so
//! that `verified_at.is_some()` always agrees with `state == Verified`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{Timestamp, UserId};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Bytes of randomness per token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Length of a generated token string (unpadded URL-safe base64 of 32 bytes).
pub const TOKEN_LENGTH: usize = 43;

/// Number of leading characters used when a token is written to logs.
pub const TOKEN_LOG_PREFIX_LENGTH: usize = 8;

// ---------------------------------------------------------------------------
// Kind / state
// ---------------------------------------------------------------------------

/// What the end user has to do before confirming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// View an advertisement.
    Ad,
    /// Complete an external task for a reward.
    Task,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ad => "ad",
            Self::Task => "task",
        }
    }

    /// Path segment of the confirmation page for this kind.
    pub fn verify_path(self) -> &'static str {
        match self {
            Self::Ad => "verify-ad",
            Self::Task => "verify-task",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenState {
    Pending,
    Verified,
}

// ---------------------------------------------------------------------------
// Task payload
// ---------------------------------------------------------------------------

/// Task details attached to a [`TokenKind::Task`] token. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPayload {
    /// Identifier of the task in the requesting bot's catalogue.
    pub task_id: i64,
    /// Where the end user performs the task.
    pub task_url: String,
    /// Human-readable description shown on the confirmation page.
    pub task_description: String,
    /// Reward credited on completion.
    pub task_points: i64,
}

impl TaskPayload {
    /// Check that every field is populated and the reward is not negative.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.task_url.trim().is_empty() {
            return Err(CoreError::Validation("task_url must not be empty".into()));
        }
        if self.task_description.trim().is_empty() {
            return Err(CoreError::Validation(
                "task_description must not be empty".into(),
            ));
        }
        if self.task_points < 0 {
            return Err(CoreError::Validation(format!(
                "task_points must be >= 0, got {}",
                self.task_points
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// NewToken
// ---------------------------------------------------------------------------

/// A request to mint a token, before an identifier has been assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewToken {
    pub user_id: UserId,
    pub kind: TokenKind,
    pub task: Option<TaskPayload>,
}

impl NewToken {
    pub fn ad(user_id: UserId) -> Self {
        Self {
            user_id,
            kind: TokenKind::Ad,
            task: None,
        }
    }

    pub fn task(user_id: UserId, task: TaskPayload) -> Self {
        Self {
            user_id,
            kind: TokenKind::Task,
            task: Some(task),
        }
    }

    /// A task payload must be present for task tokens and absent otherwise.
    pub fn validate(&self) -> Result<(), CoreError> {
        match (self.kind, &self.task) {
            (TokenKind::Task, Some(task)) => task.validate(),
            (TokenKind::Task, None) => Err(CoreError::Validation(
                "task tokens require a task payload".into(),
            )),
            (TokenKind::Ad, Some(_)) => Err(CoreError::Validation(
                "ad tokens must not carry a task payload".into(),
            )),
            (TokenKind::Ad, None) => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// TokenRecord
// ---------------------------------------------------------------------------

/// The stored state of one verification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenRecord {
    pub token: String,
    pub user_id: UserId,
    pub kind: TokenKind,
    #[serde(rename = "task_data")]
    pub task: Option<TaskPayload>,
    state: TokenState,
    pub created_at: Timestamp,
    verified_at: Option<Timestamp>,
}

impl TokenRecord {
    /// Build a fresh pending record for `new` under the identifier `token`.
    pub fn pending(token: String, new: NewToken, created_at: Timestamp) -> Self {
        Self {
            token,
            user_id: new.user_id,
            kind: new.kind,
            task: new.task,
            state: TokenState::Pending,
            created_at,
            verified_at: None,
        }
    }

    pub fn state(&self) -> TokenState {
        self.state
    }

    pub fn verified_at(&self) -> Option<Timestamp> {
        self.verified_at
    }

    pub fn is_verified(&self) -> bool {
        self.state == TokenState::Verified
    }

    /// Move the record from pending to verified.
    ///
    /// Fails with [`CoreError::AlreadyVerified`] and leaves the record
    /// untouched if it was verified before. The timestamp is clamped so it
    /// never precedes `created_at`.
    pub fn mark_verified(&mut self, at: Timestamp) -> Result<(), CoreError> {
        if self.is_verified() {
            return Err(CoreError::AlreadyVerified);
        }
        self.state = TokenState::Verified;
        self.verified_at = Some(at.max(self.created_at));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Generate a new token from 256 bits of CSPRNG output, URL-safe encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Leading characters of a token, safe to write to logs.
pub fn token_prefix(token: &str) -> &str {
    match token.char_indices().nth(TOKEN_LOG_PREFIX_LENGTH) {
        Some((idx, _)) => &token[..idx],
        None => token,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
