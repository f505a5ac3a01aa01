//! Token API handlers used by the bot (create, check) and by the
//! confirmation page (complete).
//!
//! Privileged calls check the shared secret before touching the store, so a
//! wrong secret never leaves a trace.

use adverify_core::error::CoreError;
use adverify_core::token::{NewToken, TaskPayload, TokenKind, TokenRecord};
use adverify_core::types::{Timestamp, UserId};
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateTokenRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub secret: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskTokenRequest {
    pub user_id: UserId,
    pub task_id: i64,
    pub task_url: String,
    pub task_description: String,
    pub task_points: i64,
    #[serde(default)]
    pub secret: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub success: bool,
    pub token: String,
    pub verify_url: String,
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CheckTokenRequest {
    pub token: String,
    #[serde(default)]
    pub secret: Option<String>,
}

/// Status report for the bot. An unknown token is reported in-band, the
/// way polling clients expect it.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CheckTokenResponse {
    Found {
        success: bool,
        verified: bool,
        user_id: UserId,
        kind: TokenKind,
        created_at: Timestamp,
        verified_at: Option<Timestamp>,
    },
    Missing {
        success: bool,
        verified: bool,
        error: &'static str,
    },
}

impl From<TokenRecord> for CheckTokenResponse {
    fn from(record: TokenRecord) -> Self {
        Self::Found {
            success: true,
            verified: record.is_verified(),
            user_id: record.user_id,
            kind: record.kind,
            created_at: record.created_at,
            verified_at: record.verified_at(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub token: String,
    /// Only consulted when completion requires the bot secret.
    #[serde(default)]
    pub secret: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CompleteAdResponse {
    pub success: bool,
    pub message: &'static str,
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct CompleteTaskResponse {
    pub success: bool,
    pub message: &'static str,
    pub user_id: UserId,
    pub task_data: Option<TaskPayload>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/create-token
///
/// Mint an ad-view token for `user_id`.
pub async fn create_ad_token(
    State(state): State<AppState>,
    Json(input): Json<CreateTokenRequest>,
) -> AppResult<Json<CreateTokenResponse>> {
    state.lifecycle.authorize(input.secret.as_deref())?;

    let record = state.lifecycle.create_token(NewToken::ad(input.user_id)).await?;

    Ok(Json(CreateTokenResponse {
        success: true,
        verify_url: state.config.verify_url(record.kind.verify_path(), &record.token),
        token: record.token,
        user_id: record.user_id,
        task_id: None,
    }))
}

/// POST /api/create-task-token
///
/// Mint a task token carrying the task details and reward.
pub async fn create_task_token(
    State(state): State<AppState>,
    Json(input): Json<CreateTaskTokenRequest>,
) -> AppResult<Json<CreateTokenResponse>> {
    state.lifecycle.authorize(input.secret.as_deref())?;

    let task = TaskPayload {
        task_id: input.task_id,
        task_url: input.task_url,
        task_description: input.task_description,
        task_points: input.task_points,
    };
    let record = state
        .lifecycle
        .create_token(NewToken::task(input.user_id, task))
        .await?;

    Ok(Json(CreateTokenResponse {
        success: true,
        verify_url: state.config.verify_url(record.kind.verify_path(), &record.token),
        task_id: record.task.as_ref().map(|t| t.task_id),
        token: record.token,
        user_id: record.user_id,
    }))
}

/// POST /api/check-token
///
/// Report whether a token has been verified.
pub async fn check_token(
    State(state): State<AppState>,
    Json(input): Json<CheckTokenRequest>,
) -> AppResult<Json<CheckTokenResponse>> {
    state.lifecycle.authorize(input.secret.as_deref())?;

    match state.lifecycle.get_status(&input.token).await {
        Ok(record) => Ok(Json(record.into())),
        Err(CoreError::TokenNotFound) => Ok(Json(CheckTokenResponse::Missing {
            success: false,
            verified: false,
            error: "Token not found",
        })),
        Err(e) => Err(e.into()),
    }
}

/// POST /api/complete-ad
///
/// Confirm an ad view. Fails with 404 for unknown (including blank) tokens
/// and 400 when the token was already confirmed.
pub async fn complete_ad(
    State(state): State<AppState>,
    Json(input): Json<CompleteRequest>,
) -> AppResult<Json<CompleteAdResponse>> {
    let done = complete(&state, &input).await?;

    Ok(Json(CompleteAdResponse {
        success: true,
        message: "Ad verified",
        user_id: done.user_id,
    }))
}

/// POST /api/complete-task
///
/// Confirm a task and return its payload so the bot can credit the reward.
pub async fn complete_task(
    State(state): State<AppState>,
    Json(input): Json<CompleteRequest>,
) -> AppResult<Json<CompleteTaskResponse>> {
    let done = complete(&state, &input).await?;

    Ok(Json(CompleteTaskResponse {
        success: true,
        message: "Task completed",
        user_id: done.user_id,
        task_data: done.task,
    }))
}

async fn complete(
    state: &AppState,
    input: &CompleteRequest,
) -> AppResult<adverify_core::lifecycle::Completion> {
    state
        .lifecycle
        .authorize_complete(input.secret.as_deref())?;

    Ok(state.lifecycle.complete_token(&input.token).await?)
}
