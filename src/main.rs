mod config;
mod db;
mod error;
mod llm;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use crate::services::thread::{MemoryThreadStore, PgThreadStore, ThreadStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::AppConfig::from_env();

    // The chart catalog and the tool registry must agree before any traffic.
    let registry = llm::tools::ToolRegistry::build();
    registry.verify().expect("chart tool registry mismatch");

    let store: Arc<dyn ThreadStore> = match config.database_url.as_deref() {
        Some(url) => {
            let pool = db::init_pool(url).await.expect("database init failed");
            Arc::new(PgThreadStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; threads are kept in memory only");
            Arc::new(MemoryThreadStore::new())
        }
    };

    // Non-fatal: chat is disabled if the LLM is not configured.
    let llm = match llm::LlmClient::from_env() {
        Ok(client) => {
            tracing::info!(model = client.model(), "LLM client initialized");
            Some(Arc::new(client) as Arc<dyn llm::LlmChat>)
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM client not configured; chat disabled");
            None
        }
    };

    let port = config.port;
    let state = state::AppState::new(store, llm, registry, config);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "chartbot listening");
    axum::serve(listener, app).await.expect("server failed");
}
