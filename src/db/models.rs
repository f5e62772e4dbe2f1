// Data models — Rust structs that map to database rows.
//
// These are the types that flow through the pipeline. They're separate
// from the database queries so collectors, notifiers and the dashboard can
// use them without depending on rusqlite directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted lead. One row per (platform, external_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    pub platform: String,
    pub external_id: String,
    pub title: String,
    pub content: String,
    pub link: String,
    pub draft_generated: bool,
    pub applied: bool,
    pub created_at: DateTime<Utc>,
}

/// A validated insert candidate, built from a collector's raw item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLead {
    pub platform: String,
    pub external_id: String,
    pub title: String,
    pub content: String,
    pub link: String,
}

/// Per-platform lead totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlatformCount {
    pub platform: String,
    pub total: u64,
}

/// Aggregate counts for `leadwatch status` and the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LeadStats {
    pub total: u64,
    pub drafted: u64,
    pub applied: u64,
    pub by_platform: Vec<PlatformCount>,
}
