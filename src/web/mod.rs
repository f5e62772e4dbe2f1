// Web server — Axum-based read-only lead dashboard.
//
// GET /            — HTML table of recent leads
// GET /api/leads   — the same leads as JSON
// GET /api/status  — lead totals and last cycle
// GET /health      — liveness probe
//
// Nothing here writes to the store; the scheduler runs in a separate
// process against the same SQLite file (WAL mode).

use std::sync::Arc;

use anyhow::Result;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::db::LeadStore;

pub mod handlers;

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LeadStore>,
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(store: Arc<dyn LeadStore>, port: u16, bind: &str) -> Result<()> {
    let app = build_router(AppState { store });

    let addr = format!("{bind}:{port}");
    info!("Leadwatch dashboard listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::leads::index))
        .route("/api/leads", get(handlers::leads::list_leads))
        .route("/api/status", get(handlers::status::get_status))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check — always returns 200 OK.
async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "ok" })),
    )
}

/// Typed JSON error response helper.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}
