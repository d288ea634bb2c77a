//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The orchestrator calls store methods — it never executes SQL directly.

use crate::error::EngineResult;
use crate::types::{Platform, TransactionStatus, VentureId};
use chrono::{DateTime, Utc};
use rusqlite::Connection;

mod integration;
mod ledger;

pub struct LedgerStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

/// One registered (venture, platform) connection.
#[derive(Debug, Clone)]
pub struct IntegrationRow {
    pub id: String,
    pub venture_id: VentureId,
    pub platform: Platform,
    pub encrypted_credentials: String,
    pub status: String,
    pub sync_enabled: bool,
    pub webhooks_enabled: bool,
    /// Free-form per-integration settings (JSON object).
    pub settings: serde_json::Value,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub next_sync_at: Option<DateTime<Utc>>,
}

/// One normalized ledger row.
#[derive(Debug, Clone)]
pub struct TransactionRow {
    pub id: String,
    pub venture_id: VentureId,
    pub platform: Platform,
    pub external_id: String,
    pub amount: f64,
    pub currency: String,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
    pub status: TransactionStatus,
    pub fees: f64,
    pub net_amount: f64,
    pub counterparty: Option<String>,
    pub category: String,
    pub metadata: String,
}

impl LedgerStore {
    /// Open (or create) the ledger database at `path`.
    pub fn open(path: &str) -> EngineResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        // Overlapping writers wait instead of failing immediately.
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> EngineResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases this returns a fresh, isolated database;
    /// for file-based databases it opens the same file.
    pub fn reopen(&self) -> EngineResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order. Idempotent.
    pub fn migrate(&self) -> EngineResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_integrations.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/002_transactions.sql"))?;
        Ok(())
    }
}

// Column decoding helpers shared by the store submodules. Timestamps
// are stored as RFC 3339 TEXT; platforms as their lowercase tag.

pub(crate) fn platform_col(idx: usize, value: &str) -> rusqlite::Result<Platform> {
    value.parse().map_err(|e: crate::error::EngineError| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn timestamp_col(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

pub(crate) fn json_col(idx: usize, value: &str) -> rusqlite::Result<serde_json::Value> {
    serde_json::from_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn opt_timestamp_col(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match value {
        Some(text) => timestamp_col(idx, &text).map(Some),
        None => Ok(None),
    }
}
