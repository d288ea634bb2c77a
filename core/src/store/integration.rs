use super::{json_col, opt_timestamp_col, platform_col, IntegrationRow, LedgerStore};
use crate::error::EngineResult;
use crate::types::Platform;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

impl LedgerStore {
    // ── Integration ───────────────────────────────────────────────

    /// Register a (venture, platform) connection, or replace the
    /// credentials of an existing one. Replacing re-activates a
    /// previously removed integration. Returns the row id.
    pub fn upsert_integration(
        &self,
        venture_id: &str,
        platform: Platform,
        encrypted_credentials: &str,
        settings: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> EngineResult<String> {
        let id = Uuid::new_v4().to_string();
        let stamp = now.to_rfc3339();
        self.conn.execute(
            "INSERT INTO integration
                 (id, venture_id, platform, encrypted_credentials, status,
                  sync_enabled, webhooks_enabled, settings, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 'active', 1, 1, ?5, ?6, ?6)
             ON CONFLICT (venture_id, platform) DO UPDATE SET
                 encrypted_credentials = excluded.encrypted_credentials,
                 status = 'active',
                 sync_enabled = 1,
                 webhooks_enabled = 1,
                 settings = excluded.settings,
                 updated_at = excluded.updated_at",
            params![
                id,
                venture_id,
                platform.as_str(),
                encrypted_credentials,
                serde_json::to_string(settings)?,
                stamp
            ],
        )?;
        // On conflict the original id survives; read it back.
        let stored: String = self.conn.query_row(
            "SELECT id FROM integration WHERE venture_id = ?1 AND platform = ?2",
            params![venture_id, platform.as_str()],
            |row| row.get(0),
        )?;
        Ok(stored)
    }

    /// The active integration for a (venture, platform) pair, if any.
    pub fn active_integration(
        &self,
        venture_id: &str,
        platform: Platform,
    ) -> EngineResult<Option<IntegrationRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, venture_id, platform, encrypted_credentials, status,
                    sync_enabled, webhooks_enabled, settings, last_sync_at, next_sync_at
             FROM integration
             WHERE venture_id = ?1 AND platform = ?2 AND status = 'active'",
        )?;
        let row = stmt
            .query_row(params![venture_id, platform.as_str()], Self::map_integration)
            .optional()?;
        Ok(row)
    }

    /// All active, sync-enabled integrations for a venture.
    pub fn sync_enabled_integrations(
        &self,
        venture_id: &str,
    ) -> EngineResult<Vec<IntegrationRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, venture_id, platform, encrypted_credentials, status,
                    sync_enabled, webhooks_enabled, settings, last_sync_at, next_sync_at
             FROM integration
             WHERE venture_id = ?1 AND status = 'active' AND sync_enabled = 1
             ORDER BY platform ASC",
        )?;
        let rows = stmt.query_map(params![venture_id], Self::map_integration)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Mark an integration inactive. Ledger rows are left untouched.
    /// Returns false when no active integration matched.
    pub fn deactivate_integration(
        &self,
        venture_id: &str,
        platform: Platform,
        now: DateTime<Utc>,
    ) -> EngineResult<bool> {
        let changed = self.conn.execute(
            "UPDATE integration
             SET status = 'inactive', sync_enabled = 0, updated_at = ?3
             WHERE venture_id = ?1 AND platform = ?2 AND status = 'active'",
            params![venture_id, platform.as_str(), now.to_rfc3339()],
        )?;
        Ok(changed > 0)
    }

    /// Record a completed sync: high-water mark plus the next hint.
    pub fn set_last_sync(
        &self,
        integration_id: &str,
        last_sync_at: DateTime<Utc>,
        next_sync_at: DateTime<Utc>,
    ) -> EngineResult<()> {
        self.conn.execute(
            "UPDATE integration
             SET last_sync_at = ?2, next_sync_at = ?3, updated_at = ?2
             WHERE id = ?1",
            params![
                integration_id,
                last_sync_at.to_rfc3339(),
                next_sync_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Record a failed sync: only the retry hint moves; the high-water
    /// mark stays where it was so the window is re-fetched.
    pub fn set_next_sync(
        &self,
        integration_id: &str,
        next_sync_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        self.conn.execute(
            "UPDATE integration SET next_sync_at = ?2, updated_at = ?3 WHERE id = ?1",
            params![integration_id, next_sync_at.to_rfc3339(), now.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Toggle webhook delivery for an active integration.
    /// Returns false when no active integration matched.
    pub fn set_webhooks_enabled(
        &self,
        venture_id: &str,
        platform: Platform,
        enabled: bool,
        now: DateTime<Utc>,
    ) -> EngineResult<bool> {
        let changed = self.conn.execute(
            "UPDATE integration
             SET webhooks_enabled = ?3, updated_at = ?4
             WHERE venture_id = ?1 AND platform = ?2 AND status = 'active'",
            params![
                venture_id,
                platform.as_str(),
                enabled as i32,
                now.to_rfc3339()
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn integration_count(&self, venture_id: &str) -> EngineResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM integration WHERE venture_id = ?1 AND status = 'active'",
            params![venture_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn map_integration(row: &rusqlite::Row<'_>) -> rusqlite::Result<IntegrationRow> {
        Ok(IntegrationRow {
            id: row.get(0)?,
            venture_id: row.get(1)?,
            platform: platform_col(2, &row.get::<_, String>(2)?)?,
            encrypted_credentials: row.get(3)?,
            status: row.get(4)?,
            sync_enabled: row.get::<_, i32>(5)? != 0,
            webhooks_enabled: row.get::<_, i32>(6)? != 0,
            settings: json_col(7, &row.get::<_, String>(7)?)?,
            last_sync_at: opt_timestamp_col(8, row.get(8)?)?,
            next_sync_at: opt_timestamp_col(9, row.get(9)?)?,
        })
    }
}
