use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::auth::verify_token;
use crate::state::AppState;

/// Per-request authentication gate.
///
/// Preflight requests and public path prefixes pass through untouched.
/// Everything else needs a `Authorization: Bearer <token>` header; the token
/// is verified against the shared secret and the caller's authoritative role
/// is resolved from their profile before the request is forwarded with an
/// [`crate::auth::Identity`] attached. Failure detail is logged server-side;
/// the response body only carries one of three generic messages.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let path = request.uri().path();
    if state.public_paths.iter().any(|p| path.starts_with(p.as_str())) {
        return next.run(request).await;
    }

    let origin = request.headers().get(header::ORIGIN).cloned();

    let token = match bearer_token(request.headers()) {
        Some(token) => token,
        None => return rejection("Authentication required", origin),
    };

    let mut identity = match verify_token(&token, &state.settings.jwt_secret) {
        Ok(identity) => identity,
        Err(_) => return rejection("Invalid authentication token", origin),
    };

    // The role claim in the token is a hint only; authorization uses the
    // role stored against the profile, re-read on every request.
    identity.role = match state.resolver.resolve_role(&identity.sub).await {
        Ok(role) => Some(role),
        Err(e) => {
            tracing::error!(error = %e, "authentication error");
            return rejection("Authentication failed", origin);
        }
    };

    request.extensions_mut().insert(identity);
    next.run(request).await
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::to_string)
}

/// 401 with the standard error body. Rejections still have to satisfy the
/// CORS contract the browser already negotiated, so the request's Origin is
/// mirrored along with credentials and wildcard method/header allowances.
fn rejection(detail: &str, origin: Option<HeaderValue>) -> Response {
    let mut response =
        (StatusCode::UNAUTHORIZED, Json(json!({ "detail": detail }))).into_response();

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        origin.unwrap_or_else(|| HeaderValue::from_static("*")),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*"),
    );
    response
}
