//! Account endpoints.

use amora_common::AppResult;
use axum::{Router, extract::State, response::IntoResponse, routing::post};

use crate::{extractors::AuthUser, middleware::AppState, response};

/// Delete the caller's account.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    state.account_service.delete(&user.id).await?;
    Ok(response::ok())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/delete", post(delete))
}
