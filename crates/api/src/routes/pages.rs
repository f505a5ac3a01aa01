use axum::routing::get;
use axum::Router;

use crate::handlers::pages;
use crate::state::AppState;

/// Confirmation pages. Both paths render by the token's own kind.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/verify-ad/{token}", get(pages::verify_page))
        .route("/verify-task/{token}", get(pages::verify_page))
}
