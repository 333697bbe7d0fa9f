use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Identity;
use crate::error::ApiError;
use crate::models::{Highlight, HighlightCreate, HighlightPatch};
use crate::state::AppState;

/// GET /highlights/book/:book_id - all highlights of one book, newest first
pub async fn list_book_highlights(
    State(state): State<AppState>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<Vec<Highlight>>, ApiError> {
    Ok(Json(state.highlights.list_for_book(book_id).await?))
}

/// GET /highlights/:highlight_id
pub async fn get_highlight(
    State(state): State<AppState>,
    Path(highlight_id): Path<Uuid>,
) -> Result<Json<Highlight>, ApiError> {
    let highlight = state
        .highlights
        .get(highlight_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Highlight not found"))?;
    Ok(Json(highlight))
}

/// POST /highlights
pub async fn create_highlight(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(highlight): Json<HighlightCreate>,
) -> Result<(StatusCode, Json<Highlight>), ApiError> {
    let user_id = identity.user_id()?;
    let highlight = state.highlights.create(Some(user_id), &highlight).await?;
    Ok((StatusCode::CREATED, Json(highlight)))
}

/// PUT /highlights/:highlight_id
pub async fn update_highlight(
    State(state): State<AppState>,
    Path(highlight_id): Path<Uuid>,
    Json(patch): Json<HighlightPatch>,
) -> Result<Json<Highlight>, ApiError> {
    let highlight = state
        .highlights
        .update(highlight_id, &patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Highlight not found"))?;
    Ok(Json(highlight))
}

#[derive(Debug, Deserialize)]
pub struct NotePayload {
    pub note: String,
}

/// PUT /highlights/:highlight_id/note
pub async fn update_highlight_note(
    State(state): State<AppState>,
    Path(highlight_id): Path<Uuid>,
    Json(payload): Json<NotePayload>,
) -> Result<Json<Highlight>, ApiError> {
    let highlight = state
        .highlights
        .update_note(highlight_id, &payload.note)
        .await?
        .ok_or_else(|| ApiError::not_found("Highlight not found"))?;
    Ok(Json(highlight))
}

/// DELETE /highlights/:highlight_id
pub async fn delete_highlight(
    State(state): State<AppState>,
    Path(highlight_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.highlights.delete(highlight_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Highlight not found"))
    }
}

/// DELETE /highlights/text/:text - remove all highlights with this text
pub async fn delete_highlights_by_text(
    State(state): State<AppState>,
    Path(text): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.highlights.delete_by_text(&text).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("No highlights found with the given text"))
    }
}
