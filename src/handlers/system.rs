use axum::{response::Json, Extension};
use serde_json::{json, Value};

use crate::auth::Identity;

/// GET /health - liveness probe, exempt from authentication
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /user-info - echo the authenticated caller's identity
pub async fn user_info(Extension(identity): Extension<Identity>) -> Json<Value> {
    Json(json!({
        "user_id": identity.sub,
        "email": identity.email,
        "role": identity.role,
        "metadata": identity.user_metadata,
    }))
}
