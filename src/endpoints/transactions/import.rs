use anyhow::Context;
use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State},
    response::IntoResponse,
};

use crate::{
    auth_middleware::User,
    error::ApiError,
    ingest::reader,
    services::import::{ImportSummary, import_rows},
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/v1/transactions/import",
    responses(
        (status = 200, body = ImportSummary)
    )
)]
pub async fn import(
    State(state): State<AppState>,
    user: User,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut file: Option<(String, Bytes)> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("statement.csv").to_owned();
            let data = field.bytes().await.context("error reading file data")?;
            file = Some((filename, data));
        }
    }

    let (filename, data) = file.ok_or_else(|| ApiError::BadRequest("Missing file".to_string()))?;

    let rows = reader::read_rows(&filename, &data)
        .map_err(|err| ApiError::BadRequest(format!("Failed to parse file: {err:#}")))?;

    tracing::debug!(rows = rows.len(), %filename, "parsed upload");

    let summary = import_rows(&state.data, &state.classifier, &state.narration, &user.id, rows).await?;

    return Ok(Json(summary));
}
