use anyhow::Context;
use axum::{extract::State, response::IntoResponse};
use http::{StatusCode, header::SET_COOKIE};

use crate::{data::create_id, error::ApiError, services::auth::sign_token, state::AppState};

// Local development only: sessions are normally provisioned by the auth
// collaborator, this mints one for a fixed dev user.
pub async fn ___dev_login___(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = "dev";
    let session_id = create_id();

    state
        .data
        .sessions
        .insert(user_id, &session_id)
        .await
        .context("error inserting session")?;

    let token = sign_token(&state.config.secret, user_id, &session_id)
        .context("error signing token")?;

    let cookie = cookie::Cookie::build(("auth", token))
        .path("/")
        .http_only(true)
        .secure(state.config.use_secure_cookies)
        .build();

    return Ok((StatusCode::OK, [(SET_COOKIE, cookie.to_string())]));
}
