use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde::{Deserialize, Serialize};

use crate::auth::Identity;
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::object_path;

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub book_id: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Path where the file was stored
    pub file_path: String,
    /// Book the upload belongs to
    pub book_id: String,
}

/// POST /upload?book_id=... - store the uploaded file as
/// `{user_id}/{book_id}{extension}`.
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let user_id = identity.user_id()?;
    if params.book_id.is_empty() {
        return Err(ApiError::validation("Book ID is required"));
    }

    let (filename, bytes) = read_file_field(&mut multipart).await?;
    let extension = file_extension(&filename)
        .ok_or_else(|| ApiError::validation("File must have an extension"))?;

    let object_name = format!("{}{}", params.book_id, extension);
    let file_path = state
        .storage
        .upload(&object_name, bytes, Some(&user_id.to_string()))
        .await?;

    tracing::info!(path = %file_path, book_id = %params.book_id, "file upload successful");
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse { file_path, book_id: params.book_id }),
    ))
}

/// GET /upload/:name - fetch one of the caller's stored files
pub async fn download_file(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let user_id = identity.user_id()?;
    let path = object_path(&name, Some(&user_id.to_string()));

    let bytes = state
        .storage
        .download(&path)
        .await?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    )
        .into_response())
}

/// DELETE /upload/:name
pub async fn delete_file(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user_id = identity.user_id()?;
    let path = object_path(&name, Some(&user_id.to_string()));

    if state.storage.delete(&path).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("File not found"))
    }
}

async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .ok_or_else(|| ApiError::validation("File field has no filename"))?
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation(format!("Failed to read file: {}", e)))?;
        return Ok((filename, bytes.to_vec()));
    }
    Err(ApiError::validation("Missing file field"))
}

fn file_extension(filename: &str) -> Option<String> {
    let ext = std::path::Path::new(filename).extension()?;
    Some(format!(".{}", ext.to_string_lossy().to_lowercase()))
}
