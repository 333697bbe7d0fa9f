use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Settings;
use crate::handlers::{books, feedback, highlights, system, upload};
use crate::middleware::{auth_middleware, request_log_middleware};
use crate::state::AppState;

pub const API_PREFIX: &str = "/api/v1";

/// Route prefixes exempt from authentication. Only the liveness probe;
/// everything else this service serves requires a caller.
pub fn public_paths() -> Vec<String> {
    vec![format!("{}/health", API_PREFIX)]
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings);

    Router::new()
        .nest(API_PREFIX, api_routes())
        // Layer order is inside-out: auth runs innermost, then the
        // correlation/timing stage, then CORS and tracing around everything.
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(middleware::from_fn(request_log_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(system::health))
        .route("/user-info", get(system::user_info))
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:book_id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        .route("/books/:book_id/progress", put(books::update_progress))
        .route("/highlights", post(highlights::create_highlight))
        .route("/highlights/book/:book_id", get(highlights::list_book_highlights))
        .route(
            "/highlights/:highlight_id",
            get(highlights::get_highlight)
                .put(highlights::update_highlight)
                .delete(highlights::delete_highlight),
        )
        .route(
            "/highlights/:highlight_id/note",
            put(highlights::update_highlight_note),
        )
        .route(
            "/highlights/text/:text",
            delete(highlights::delete_highlights_by_text),
        )
        .route(
            "/feedback",
            get(feedback::list_feedback).post(feedback::create_feedback),
        )
        .route("/upload", post(upload::upload_file))
        .route(
            "/upload/:name",
            get(upload::download_file).delete(upload::delete_file),
        )
}

fn cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_LENGTH])
        .max_age(std::time::Duration::from_secs(600))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ObjectStorage;
    use crate::testing::{mint_token, MemoryStore};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    const JWT_SECRET: &str = "test-jwt-secret";

    fn test_settings() -> Settings {
        Settings::from_lookup(|name| match name {
            "SUPABASE_URL" => Some("http://localhost:54321".to_string()),
            "SUPABASE_KEY" => Some("key".to_string()),
            "SUPABASE_JWT_SECRET" => Some(JWT_SECRET.to_string()),
            "SUPABASE_DB_CONNECTION" => Some("postgres://localhost/postgres".to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn test_app() -> (Router, Arc<MemoryStore>) {
        let settings = test_settings();
        let store = Arc::new(MemoryStore::new());
        let storage = ObjectStorage::new(&settings);
        let state = AppState::new(settings, store.clone(), storage, public_paths());
        (router(state), store)
    }

    fn seeded_user(store: &MemoryStore) -> (Uuid, String) {
        let user = Uuid::new_v4();
        let mut profile = serde_json::Map::new();
        profile.insert("email".to_string(), json!("reader@example.com"));
        profile.insert("role".to_string(), json!("authenticated"));
        store.seed("profiles", user, profile);
        (user, mint_token(&user.to_string(), JWT_SECRET))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let (app, _) = test_app();
        let response = app
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn missing_header_is_401_with_standard_body() {
        let (app, _) = test_app();
        let response = app
            .oneshot(
                Request::get("/api/v1/books")
                    .header("Origin", "http://localhost:8042")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .unwrap(),
            "http://localhost:8042"
        );
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-credentials")
                .unwrap(),
            "true"
        );
        assert_eq!(
            body_json(response).await,
            json!({"detail": "Authentication required"})
        );
    }

    #[tokio::test]
    async fn non_bearer_header_is_401() {
        let (app, _) = test_app();
        let response = app
            .oneshot(
                Request::get("/api/v1/books")
                    .header("Authorization", "Basic dXNlcjpwdw==")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            json!({"detail": "Authentication required"})
        );
    }

    #[tokio::test]
    async fn invalid_token_is_401() {
        let (app, _) = test_app();
        let response = app
            .oneshot(
                Request::get("/api/v1/books")
                    .header("Authorization", "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            json!({"detail": "Invalid authentication token"})
        );
    }

    #[tokio::test]
    async fn wrong_secret_is_401() {
        let (app, _) = test_app();
        let token = mint_token(&Uuid::new_v4().to_string(), "some-other-secret");
        let response = app
            .oneshot(
                Request::get("/api/v1/books")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            json!({"detail": "Invalid authentication token"})
        );
    }

    #[tokio::test]
    async fn valid_token_without_profile_is_auth_failure_not_500() {
        let (app, _) = test_app();
        let token = mint_token(&Uuid::new_v4().to_string(), JWT_SECRET);
        let response = app
            .oneshot(
                Request::get("/api/v1/books")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            json!({"detail": "Authentication failed"})
        );
    }

    #[tokio::test]
    async fn user_info_reflects_resolved_role() {
        let (app, store) = test_app();
        let (user, token) = seeded_user(&store);

        let response = app
            .oneshot(
                Request::get("/api/v1/user-info")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["user_id"], json!(user.to_string()));
        assert_eq!(body["role"], json!("authenticated"));
    }

    #[tokio::test]
    async fn book_create_then_fetch_round_trips() {
        let (app, store) = test_app();
        let (user, token) = seeded_user(&store);

        let create = Request::post("/api/v1/books")
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .body(Body::from(
                json!({
                    "user_id": user.to_string(),
                    "title": "Dune",
                    "format": "epub",
                })
                .to_string(),
            ))
            .unwrap();

        let response = app.clone().oneshot(create).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        let book_id = created["id"].as_str().unwrap().to_string();

        let fetch = Request::get(format!("/api/v1/books/{}", book_id))
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(fetch).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched = body_json(response).await;
        assert_eq!(fetched["title"], json!("Dune"));
        assert_eq!(fetched["user_id"], json!(user.to_string()));
    }

    #[tokio::test]
    async fn delete_of_missing_book_is_404() {
        let (app, store) = test_app();
        let (_, token) = seeded_user(&store);

        let request = Request::delete(format!("/api/v1/books/{}", Uuid::new_v4()))
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn only_health_is_public() {
        let (app, _) = test_app();
        for path in ["/docs", "/redoc", "/openapi.json"] {
            let response = app
                .clone()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", path);
        }
    }

    #[tokio::test]
    async fn options_requests_bypass_auth() {
        let (app, _) = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/v1/books")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
