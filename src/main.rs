use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use readspace_api::app;
use readspace_api::config::{Settings, StoreBackend};
use readspace_api::database::{PgRecordStore, RecordStore, RestRecordStore};
use readspace_api::state::AppState;
use readspace_api::storage::ObjectStorage;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up SUPABASE_* and friends.
    let _ = dotenvy::dotenv();

    let settings = Settings::from_env().unwrap_or_else(|e| {
        eprintln!("configuration error: {}", e);
        std::process::exit(1);
    });

    init_tracing(&settings);
    tracing::info!(environment = ?settings.environment, backend = ?settings.store_backend, "starting ReadSpace API");

    let store: Arc<dyn RecordStore> = match settings.store_backend {
        StoreBackend::Postgres => Arc::new(
            PgRecordStore::connect(&settings)
                .await
                .unwrap_or_else(|e| panic!("failed to initialize database pool: {}", e)),
        ),
        StoreBackend::Rest => Arc::new(RestRecordStore::new(&settings)),
    };

    let storage = ObjectStorage::new(&settings);
    let port = settings.port;
    let state = AppState::new(settings, store, storage, app::public_paths());
    let router = app::router(state);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("ReadSpace API listening on http://{}", bind_addr);
    axum::serve(listener, router).await.expect("server");
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone()));

    if settings.is_production() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .compact()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
