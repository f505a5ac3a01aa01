use axum::routing::post;
use axum::Router;

use crate::handlers::tokens;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-token", post(tokens::create_ad_token))
        .route("/create-task-token", post(tokens::create_task_token))
        .route("/check-token", post(tokens::check_token))
        .route("/complete-ad", post(tokens::complete_ad))
        .route("/complete-task", post(tokens::complete_task))
}
