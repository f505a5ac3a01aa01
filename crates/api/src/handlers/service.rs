use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Number of tokens held by the store.
    pub tokens: usize,
    /// Postbacks dispatched but not yet finished.
    pub postbacks_in_flight: usize,
}

/// GET /health -- returns service and store health.
pub async fn health_check(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let tokens = state.lifecycle.token_count().await?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        tokens,
        postbacks_in_flight: state.lifecycle.in_flight_postbacks(),
    }))
}

/// GET / -- service index listing the public endpoints.
pub async fn index() -> Json<Value> {
    Json(json!({
        "service": "Ad & Task Verification API",
        "status": "running",
        "endpoints": {
            "create_ad_token": "POST /api/create-token",
            "create_task_token": "POST /api/create-task-token",
            "check_token": "POST /api/check-token",
            "verify_ad": "GET /verify-ad/{token}",
            "verify_task": "GET /verify-task/{token}",
            "complete_ad": "POST /api/complete-ad",
            "complete_task": "POST /api/complete-task"
        }
    }))
}
