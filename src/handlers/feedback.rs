use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};

use crate::auth::Identity;
use crate::error::ApiError;
use crate::handlers::Pagination;
use crate::models::{Feedback, FeedbackCreate};
use crate::state::AppState;

/// POST /feedback
pub async fn create_feedback(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(feedback): Json<FeedbackCreate>,
) -> Result<(StatusCode, Json<Feedback>), ApiError> {
    let user_id = identity.user_id().ok();
    let feedback = state.feedback.create(user_id, &feedback).await?;
    Ok((StatusCode::CREATED, Json(feedback)))
}

/// GET /feedback
pub async fn list_feedback(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Feedback>>, ApiError> {
    Ok(Json(state.feedback.list(page.skip, page.limit).await?))
}
