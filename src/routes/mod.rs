//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the chat streaming endpoint, thread CRUD, and the chart tool
//! catalog under one Axum router. Identity comes from the upstream session
//! layer via [`auth::AuthUser`].

pub mod auth;
pub mod chat;
pub mod threads;
pub mod tools;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat::chat))
        .route("/api/threads", get(threads::list_threads).post(threads::create_thread))
        .route("/api/threads/{id}", get(threads::get_thread).delete(threads::delete_thread))
        .route("/api/tools", get(tools::list_tools))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
