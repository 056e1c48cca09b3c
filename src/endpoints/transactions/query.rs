use anyhow::Context;
use axum::{Json, extract::State, response::IntoResponse};

use crate::{auth_middleware::User, data::Tx, error::ApiError, state::AppState};

#[utoipa::path(
    post,
    path = "/v1/transactions/query",
    responses(
        (status = 200, body = Vec<Tx>),
    )
)]
pub async fn query(
    State(state): State<AppState>,
    user: User,
) -> Result<impl IntoResponse, ApiError> {
    let res = state
        .data
        .transactions
        .query(&user.id)
        .await
        .context("error querying transactions")?;

    Ok(Json(res))
}
