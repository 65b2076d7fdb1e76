mod analytics;
mod config;
mod database;
mod error;
mod filter;
mod handlers;
mod models;
mod state;
mod storage;
mod store;
mod utils;

use std::net::SocketAddr;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::{
    config::Config,
    handlers::{
        delete_file, download_file, file_analytics, get_file, list_files, update_file,
        upload_file, user_logs,
    },
    state::AppState,
    storage::init_storage,
    store::init_stores,
};

/// Builds the application router over the given state.
fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/files/upload", post(upload_file))
        .route("/files", get(list_files))
        .route("/files/analytics", get(file_analytics))
        .route("/files/logs/user/{userId}", get(user_logs))
        .route("/files/{id}", get(get_file))
        .route("/files/{id}", patch(update_file))
        .route("/files/{id}", delete(delete_file))
        .route("/files/{id}/download", get(download_file))
        // Let oversized payloads through to the handler's own size check
        // instead of axum's default 2MB cutoff
        .layer(DefaultBodyLimit::max(
            state.config.max_file_size as usize + 1024 * 1024,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env().expect("Failed to load configuration");

    let (files, logs) = init_stores(&config)
        .await
        .expect("Failed to initialize record stores");

    let storage = init_storage(&config).await;

    let app_state = AppState {
        files,
        logs,
        storage,
        config,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(app_state)).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
