use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use uuid::Uuid;

use crate::auth::Identity;
use crate::error::ApiError;
use crate::handlers::Pagination;
use crate::models::{Book, BookCreate, BookPatch, BookProgress};
use crate::state::AppState;

/// GET /books - the caller's library
pub async fn list_books(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let user_id = identity.user_id()?;
    let books = state.books.list_for_user(user_id, page.skip, page.limit).await?;
    Ok(Json(books))
}

/// GET /books/:book_id
pub async fn get_book(
    State(state): State<AppState>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<Book>, ApiError> {
    let book = state
        .books
        .get(book_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Book not found"))?;
    Ok(Json(book))
}

/// POST /books
pub async fn create_book(
    State(state): State<AppState>,
    Json(book): Json<BookCreate>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let book = state.books.create(&book).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// PUT /books/:book_id
pub async fn update_book(
    State(state): State<AppState>,
    Path(book_id): Path<Uuid>,
    Json(patch): Json<BookPatch>,
) -> Result<Json<Book>, ApiError> {
    let book = state
        .books
        .update(book_id, &patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Book not found"))?;
    Ok(Json(book))
}

/// PUT /books/:book_id/progress
pub async fn update_progress(
    State(state): State<AppState>,
    Path(book_id): Path<Uuid>,
    Json(progress): Json<BookProgress>,
) -> Result<Json<Book>, ApiError> {
    let book = state
        .books
        .update_progress(book_id, &progress)
        .await?
        .ok_or_else(|| ApiError::not_found("Book not found"))?;
    Ok(Json(book))
}

/// DELETE /books/:book_id
pub async fn delete_book(
    State(state): State<AppState>,
    Path(book_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.books.delete(book_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Book not found"))
    }
}
