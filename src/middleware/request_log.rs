use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use uuid::Uuid;

/// Correlation id + timing stage. Wraps every request, public ones
/// included: assigns a request id (reusing `x-request-id` when the caller
/// already sent one), logs start and completion with elapsed wall-clock
/// time, and leaves the response itself untouched.
pub async fn request_log_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "request started"
    );

    let response = next.run(request).await;
    let elapsed = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(
            request_id = %request_id,
            status = %status,
            elapsed_ms = elapsed.as_millis() as u64,
            "request failed"
        );
    } else {
        tracing::info!(
            request_id = %request_id,
            status = %status,
            elapsed_ms = elapsed.as_millis() as u64,
            "request completed"
        );
    }

    response
}
