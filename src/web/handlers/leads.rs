// Lead list handlers.
//
// GET /api/leads — newest first, optional ?platform= filter, ?limit= (default 100, max 1000)
// GET /          — the same list rendered as an HTML table
//
// Lead text comes from third-party pages, so everything interpolated into
// the HTML is escaped.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::error;

use crate::db::models::Lead;
use crate::output::truncate_chars;
use crate::web::{api_error, AppState};

/// Characters of content shown per row in the HTML table.
pub const TABLE_PREVIEW_CHARS: usize = 150;

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 1000;

#[derive(Deserialize, Default)]
pub struct LeadsQuery {
    /// Case-insensitive platform name
    pub platform: Option<String>,
    /// Max rows (default 100, max 1000)
    pub limit: Option<u32>,
}

impl LeadsQuery {
    fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    fn platform(&self) -> Option<&str> {
        self.platform.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }
}

async fn load(state: &AppState, params: &LeadsQuery) -> Result<Vec<Lead>, Response> {
    state
        .store
        .recent_leads(params.limit(), params.platform())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to load leads");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to load leads")
        })
}

/// GET /api/leads — recent leads as JSON.
pub async fn list_leads(
    State(state): State<AppState>,
    Query(params): Query<LeadsQuery>,
) -> Response {
    match load(&state, &params).await {
        Ok(leads) => Json(serde_json::json!({
            "leads": leads,
            "count": leads.len(),
            "limit": params.limit(),
        }))
        .into_response(),
        Err(response) => response,
    }
}

/// GET / — recent leads as an HTML table.
pub async fn index(State(state): State<AppState>, Query(params): Query<LeadsQuery>) -> Response {
    match load(&state, &params).await {
        Ok(leads) => Html(render_table(&leads)).into_response(),
        Err(response) => response,
    }
}

fn render_table(leads: &[Lead]) -> String {
    let mut rows = String::new();
    for lead in leads {
        let mut flags = Vec::new();
        if lead.draft_generated {
            flags.push("drafted");
        }
        if lead.applied {
            flags.push("applied");
        }
        rows.push_str(&format!(
            "<tr><td>{platform}</td><td>{title}</td><td>{content}</td>\
             <td><a href=\"{href}\" target=\"_blank\" rel=\"noopener\">View</a></td>\
             <td>{flags}</td><td>{created}</td></tr>\n",
            platform = html_escape::encode_text(&lead.platform),
            title = html_escape::encode_text(&lead.title),
            content = html_escape::encode_text(&truncate_chars(&lead.content, TABLE_PREVIEW_CHARS)),
            href = html_escape::encode_double_quoted_attribute(&lead.link),
            flags = flags.join(", "),
            created = lead.created_at.format("%Y-%m-%d %H:%M"),
        ));
    }

    let body = if leads.is_empty() {
        "<p>No leads yet.</p>".to_string()
    } else {
        format!(
            "<table>\n<thead><tr><th>Platform</th><th>Title</th><th>Content</th>\
             <th>Link</th><th>Status</th><th>Found (UTC)</th></tr></thead>\n\
             <tbody>\n{rows}</tbody>\n</table>"
        )
    };

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Leadwatch</title>\n\
         <style>body{{font-family:sans-serif;margin:2em}}table{{border-collapse:collapse;width:100%}}\
         td,th{{border:1px solid #ddd;padding:6px;vertical-align:top}}th{{background:#f4f4f4}}</style>\n\
         </head>\n<body>\n<h1>Leads</h1>\n{body}\n</body>\n</html>\n"
    )
}
