use axum::routing::get;
use axum::Router;

use crate::handlers::service;
use crate::state::AppState;

/// Mount service routes (root level, NOT under `/api`).
///
/// ```text
/// GET /         service info
/// GET /health   liveness and store size
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(service::index))
        .route("/health", get(service::health_check))
}
