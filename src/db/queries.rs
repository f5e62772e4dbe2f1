// Database queries — CRUD operations for all tables.
//
// Every database interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::{Lead, LeadStats, NewLead, PlatformCount};
use crate::error::StorageError;

type Result<T> = std::result::Result<T, StorageError>;

const LEAD_COLUMNS: &str =
    "id, platform, external_id, title, content, link, draft_generated, applied, created_at";

// --- Leads ---

/// Insert a lead unless one with the same (platform, external_id) exists.
///
/// A single statement does both the check and the write, so two attempts
/// on the same key can never both report success.
pub fn insert_lead_if_absent(conn: &Connection, lead: &NewLead) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO leads (platform, external_id, title, content, link)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(platform, external_id) DO NOTHING",
        params![
            lead.platform,
            lead.external_id,
            lead.title,
            lead.content,
            lead.link,
        ],
    )?;
    Ok(inserted == 1)
}

/// Flip `draft_generated` to true. No-op if the lead is missing or already drafted.
pub fn mark_drafted(conn: &Connection, platform: &str, external_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE leads SET draft_generated = 1
         WHERE platform = ?1 AND external_id = ?2 AND draft_generated = 0",
        params![platform, external_id],
    )?;
    Ok(())
}

/// Flip `applied` to true. No-op if the lead is missing or already applied.
pub fn mark_applied(conn: &Connection, platform: &str, external_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE leads SET applied = 1
         WHERE platform = ?1 AND external_id = ?2 AND applied = 0",
        params![platform, external_id],
    )?;
    Ok(())
}

pub fn lead_exists(conn: &Connection, platform: &str, external_id: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM leads WHERE platform = ?1 AND external_id = ?2)",
        params![platform, external_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn get_lead(conn: &Connection, platform: &str, external_id: &str) -> Result<Option<Lead>> {
    let sql = format!("SELECT {LEAD_COLUMNS} FROM leads WHERE platform = ?1 AND external_id = ?2");
    let raw = conn
        .query_row(&sql, params![platform, external_id], read_lead_row)
        .optional()?;
    raw.map(LeadRow::into_lead).transpose()
}

/// Most recent leads first, optionally restricted to one platform.
pub fn get_recent_leads(
    conn: &Connection,
    limit: u32,
    platform: Option<&str>,
) -> Result<Vec<Lead>> {
    let sql = format!(
        "SELECT {LEAD_COLUMNS} FROM leads
         WHERE ?1 IS NULL OR platform = ?1 COLLATE NOCASE
         ORDER BY created_at DESC, id DESC
         LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![platform, limit], read_lead_row)?;

    let mut leads = Vec::new();
    for row in rows {
        leads.push(row?.into_lead()?);
    }
    Ok(leads)
}

/// Totals across the whole store, broken down by platform.
pub fn get_lead_stats(conn: &Connection) -> Result<LeadStats> {
    let (total, drafted, applied): (i64, i64, i64) = conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(draft_generated), 0),
                COALESCE(SUM(applied), 0)
         FROM leads",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    let mut stmt = conn.prepare(
        "SELECT platform, COUNT(*) FROM leads GROUP BY platform ORDER BY COUNT(*) DESC, platform",
    )?;
    let rows = stmt.query_map([], |row| {
        let total: i64 = row.get(1)?;
        Ok(PlatformCount {
            platform: row.get(0)?,
            total: total as u64,
        })
    })?;

    let mut by_platform = Vec::new();
    for row in rows {
        by_platform.push(row?);
    }

    Ok(LeadStats {
        total: total as u64,
        drafted: drafted as u64,
        applied: applied as u64,
        by_platform,
    })
}

// --- Scan state ---

/// Get a scan state value by key (e.g., "last_cycle_at").
pub fn get_scan_state(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM scan_state WHERE key = ?1")?;
    let result = stmt.query_row(params![key], |row| row.get(0)).optional()?;
    Ok(result)
}

/// Set a scan state value (upsert).
pub fn set_scan_state(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO scan_state (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}

// --- Row mapping ---

/// Raw column values; the timestamp is parsed outside the rusqlite closure
/// so a bad value surfaces as a corrupt row rather than a type error.
struct LeadRow {
    id: i64,
    platform: String,
    external_id: String,
    title: String,
    content: String,
    link: String,
    draft_generated: bool,
    applied: bool,
    created_at: String,
}

fn read_lead_row(row: &Row<'_>) -> rusqlite::Result<LeadRow> {
    Ok(LeadRow {
        id: row.get(0)?,
        platform: row.get(1)?,
        external_id: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        link: row.get(5)?,
        draft_generated: row.get(6)?,
        applied: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl LeadRow {
    fn into_lead(self) -> Result<Lead> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| {
                StorageError::Corrupt(format!(
                    "lead {} has bad created_at {:?}: {e}",
                    self.id, self.created_at
                ))
            })?
            .with_timezone(&Utc);

        Ok(Lead {
            id: self.id,
            platform: self.platform,
            external_id: self.external_id,
            title: self.title,
            content: self.content,
            link: self.link,
            draft_generated: self.draft_generated,
            applied: self.applied,
            created_at,
        })
    }
}
