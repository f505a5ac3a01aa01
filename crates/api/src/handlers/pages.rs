//! Confirmation page handlers. No secret is required: the token in the path
//! is the capability.

use adverify_core::error::CoreError;
use axum::extract::{Path, State};
use axum::response::Html;

use crate::error::AppResult;
use crate::pages::{self, PageContext};
use crate::state::AppState;

/// GET /verify-ad/{token} and GET /verify-task/{token}
///
/// The page variant follows the stored record's kind, so either path works
/// for any token.
pub async fn verify_page(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Html<String>> {
    let html = match state.lifecycle.get_status(&token).await {
        Ok(record) if record.is_verified() => pages::already_verified(),
        Ok(record) => pages::pending(
            &record,
            PageContext {
                ad_link: &state.config.ad_link,
                dwell_secs: state.lifecycle.policy().client_dwell_secs,
                confirm_on_page: !state.lifecycle.policy().require_secret_on_complete,
            },
        ),
        Err(CoreError::TokenNotFound) => pages::invalid_link(),
        Err(e) => return Err(e.into()),
    };
    Ok(Html(html))
}
