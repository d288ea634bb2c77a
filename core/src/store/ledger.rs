use super::{platform_col, timestamp_col, LedgerStore, TransactionRow};
use crate::adapter::NormalizedTransaction;
use crate::error::EngineResult;
use crate::types::{Platform, TransactionStatus};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

impl LedgerStore {
    // ── Ledger ────────────────────────────────────────────────────

    /// Look up a ledger row by its provider identity.
    pub fn find_transaction(
        &self,
        venture_id: &str,
        platform: Platform,
        external_id: &str,
    ) -> EngineResult<Option<TransactionRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, venture_id, platform, external_id, amount, currency,
                    description, occurred_at, status, fees, net_amount,
                    counterparty, category, metadata
             FROM ledger_transaction
             WHERE venture_id = ?1 AND platform = ?2 AND external_id = ?3",
        )?;
        let row = stmt
            .query_row(
                params![venture_id, platform.as_str(), external_id],
                Self::map_transaction,
            )
            .optional()?;
        Ok(row)
    }

    /// Insert a normalized record, or overwrite the existing row that
    /// shares its (venture, platform, external_id) identity. The
    /// uniqueness constraint resolves races between overlapping
    /// writers; last write wins on every mutable field.
    pub fn upsert_transaction(
        &self,
        venture_id: &str,
        platform: Platform,
        record: &NormalizedTransaction,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let id = Uuid::new_v4().to_string();
        let stamp = now.to_rfc3339();
        let metadata = serde_json::to_string(&record.metadata)?;
        self.conn.execute(
            "INSERT INTO ledger_transaction
                 (id, venture_id, platform, external_id, amount, currency,
                  description, occurred_at, status, fees, net_amount,
                  counterparty, category, metadata, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)
             ON CONFLICT (venture_id, platform, external_id) DO UPDATE SET
                 amount = excluded.amount,
                 currency = excluded.currency,
                 description = excluded.description,
                 occurred_at = excluded.occurred_at,
                 status = excluded.status,
                 fees = excluded.fees,
                 net_amount = excluded.net_amount,
                 counterparty = excluded.counterparty,
                 category = excluded.category,
                 metadata = excluded.metadata,
                 updated_at = excluded.updated_at",
            params![
                id,
                venture_id,
                platform.as_str(),
                record.external_id,
                record.amount,
                record.currency,
                record.description,
                record.occurred_at.to_rfc3339(),
                record.status.as_str(),
                record.fees,
                record.net_amount,
                record.counterparty,
                record.category,
                metadata,
                stamp,
            ],
        )?;
        Ok(())
    }

    /// All ledger rows for a venture, newest first. Test harnesses and
    /// the CLI use this; sync paths go through `find_transaction`.
    pub fn transactions_for(&self, venture_id: &str) -> EngineResult<Vec<TransactionRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, venture_id, platform, external_id, amount, currency,
                    description, occurred_at, status, fees, net_amount,
                    counterparty, category, metadata
             FROM ledger_transaction
             WHERE venture_id = ?1
             ORDER BY occurred_at DESC, external_id ASC",
        )?;
        let rows = stmt.query_map(params![venture_id], Self::map_transaction)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn transaction_count(&self, venture_id: &str) -> EngineResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM ledger_transaction WHERE venture_id = ?1",
            params![venture_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn map_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<TransactionRow> {
        Ok(TransactionRow {
            id: row.get(0)?,
            venture_id: row.get(1)?,
            platform: platform_col(2, &row.get::<_, String>(2)?)?,
            external_id: row.get(3)?,
            amount: row.get(4)?,
            currency: row.get(5)?,
            description: row.get(6)?,
            occurred_at: timestamp_col(7, &row.get::<_, String>(7)?)?,
            status: TransactionStatus::parse(&row.get::<_, String>(8)?),
            fees: row.get(9)?,
            net_amount: row.get(10)?,
            counterparty: row.get(11)?,
            category: row.get(12)?,
            metadata: row.get(13)?,
        })
    }
}
