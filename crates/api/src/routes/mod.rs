pub mod health;
pub mod pages;
pub mod tokens;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /create-token                 mint ad token (bot secret)
/// /create-task-token            mint task token (bot secret)
/// /check-token                  token status (bot secret)
/// /complete-ad                  confirm ad view (page)
/// /complete-task                confirm task (page)
/// ```
pub fn api_routes() -> Router<AppState> {
    tokens::router()
}

/// Full route tree without middleware: service info, health, confirmation
/// pages and the `/api` tree.
pub fn app_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(pages::router())
        .nest("/api", api_routes())
}
