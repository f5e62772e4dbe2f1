// SqliteLeadStore — rusqlite backend implementing the LeadStore trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Sync.
// Every trait method takes the lock, does its synchronous rusqlite work and
// returns, so all writes are serialized through one connection. The lock is
// never held across an .await on anything else.

use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::{Lead, LeadStats, NewLead};
use super::queries;
use super::traits::LeadStore;
use crate::error::StorageError;

pub struct SqliteLeadStore {
    conn: Mutex<Connection>,
}

impl SqliteLeadStore {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl LeadStore for SqliteLeadStore {
    async fn table_count(&self) -> Result<i64, StorageError> {
        let conn = self.conn.lock().await;
        Ok(super::schema::table_count(&conn)?)
    }

    async fn insert_if_absent(&self, lead: &NewLead) -> Result<bool, StorageError> {
        let conn = self.conn.lock().await;
        queries::insert_lead_if_absent(&conn, lead)
    }

    async fn mark_drafted(&self, platform: &str, external_id: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock().await;
        queries::mark_drafted(&conn, platform, external_id)
    }

    async fn mark_applied(&self, platform: &str, external_id: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock().await;
        queries::mark_applied(&conn, platform, external_id)
    }

    async fn exists(&self, platform: &str, external_id: &str) -> Result<bool, StorageError> {
        let conn = self.conn.lock().await;
        queries::lead_exists(&conn, platform, external_id)
    }

    async fn get_lead(
        &self,
        platform: &str,
        external_id: &str,
    ) -> Result<Option<Lead>, StorageError> {
        let conn = self.conn.lock().await;
        queries::get_lead(&conn, platform, external_id)
    }

    async fn recent_leads(
        &self,
        limit: u32,
        platform: Option<&str>,
    ) -> Result<Vec<Lead>, StorageError> {
        let conn = self.conn.lock().await;
        queries::get_recent_leads(&conn, limit, platform)
    }

    async fn lead_stats(&self) -> Result<LeadStats, StorageError> {
        let conn = self.conn.lock().await;
        queries::get_lead_stats(&conn)
    }

    async fn get_scan_state(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn.lock().await;
        queries::get_scan_state(&conn, key)
    }

    async fn set_scan_state(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock().await;
        queries::set_scan_state(&conn, key, value)
    }
}
