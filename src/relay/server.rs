//! HTTP server setup and configuration.

use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::config::Config;

/// Shared application state.
///
/// Everything here is immutable after startup; concurrent requests
/// share it without coordination.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http: Client,
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/chat-process/chatgpt", post(handlers::chat_process_chatgpt))
        .route("/chat-process/cpm-conv", post(handlers::chat_process_cpm_conv))
        .route("/config", post(handlers::config_info))
        .route("/health", get(handlers::health))
}

/// Create the axum router with all endpoints.
///
/// Routes are mounted both at the root and under `/api`, matching the
/// deployments this service already serves.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(api_routes())
        .nest("/api", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let listen_addr = config.server.listen.clone();

    // No overall request timeout: streaming replies are open-ended.
    // The CPM relay applies its own per-call timeout.
    let http = Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let state = AppState {
        config: Arc::new(config),
        http,
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "Starting chatrelay server");

    axum::serve(listener, app).await?;

    Ok(())
}
