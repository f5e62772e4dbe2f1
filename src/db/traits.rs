// LeadStore trait — backend-agnostic async interface for the lead table.
//
// The pipeline, scheduler, status command and dashboard all hold an
// `Arc<dyn LeadStore>`. SqliteLeadStore is the production implementation;
// tests can drop in their own (e.g. one that fails on demand).

use async_trait::async_trait;

use super::models::{Lead, LeadStats, NewLead};
use crate::error::StorageError;

#[async_trait]
pub trait LeadStore: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64, StorageError>;

    // --- Leads ---

    /// Persist the lead if its (platform, external_id) is new.
    /// Returns false when the key was already present ("already processed").
    async fn insert_if_absent(&self, lead: &NewLead) -> Result<bool, StorageError>;

    /// Mark a lead as having a draft reply generated (idempotent).
    async fn mark_drafted(&self, platform: &str, external_id: &str) -> Result<(), StorageError>;

    /// Mark a lead as auto-applied (idempotent).
    async fn mark_applied(&self, platform: &str, external_id: &str) -> Result<(), StorageError>;

    /// Read-only membership check.
    async fn exists(&self, platform: &str, external_id: &str) -> Result<bool, StorageError>;

    /// Load a single lead.
    async fn get_lead(&self, platform: &str, external_id: &str)
        -> Result<Option<Lead>, StorageError>;

    /// Most recent leads first, optionally filtered to one platform.
    async fn recent_leads(
        &self,
        limit: u32,
        platform: Option<&str>,
    ) -> Result<Vec<Lead>, StorageError>;

    /// Totals by platform plus drafted/applied counts.
    async fn lead_stats(&self) -> Result<LeadStats, StorageError>;

    // --- Scan state ---

    /// Get a scan state value by key (e.g., "last_cycle_at").
    async fn get_scan_state(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Set a scan state value (upsert).
    async fn set_scan_state(&self, key: &str, value: &str) -> Result<(), StorageError>;
}
