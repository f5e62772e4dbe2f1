// GET /api/status — lead totals plus the last cycle's time and summary.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use crate::web::{api_error, AppState};

pub async fn get_status(State(state): State<AppState>) -> Response {
    let stats = match state.store.lead_stats().await {
        Ok(stats) => stats,
        Err(e) => {
            error!(error = %e, "Failed to load lead stats");
            return api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to load stats");
        }
    };

    let last_cycle_at = scan_state(&state, "last_cycle_at").await;
    let last_cycle_summary = scan_state(&state, "last_cycle_summary").await;

    Json(serde_json::json!({
        "leads": stats,
        "last_cycle_at": last_cycle_at,
        "last_cycle_summary": last_cycle_summary,
    }))
    .into_response()
}

/// A scan_state value, or null on failure. The totals are still worth serving.
async fn scan_state(state: &AppState, key: &str) -> Option<String> {
    match state.store.get_scan_state(key).await {
        Ok(value) => value,
        Err(e) => {
            error!(key, error = %e, "Failed to load scan state");
            None
        }
    }
}
