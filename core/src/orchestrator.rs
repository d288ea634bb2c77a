//! Sync orchestrator — drives authenticate → fetch → reconcile →
//! persist for each registered integration.
//!
//! The orchestrator owns integration configuration and the reconcile
//! loop. Adapters never see stored config; the store never sees
//! plaintext credentials. Every collaborator is injected, so tests
//! swap in fixed clocks, scripted adapters, and in-memory stores.

use crate::adapter::{Credentials, NormalizedTransaction};
use crate::clock::SyncClock;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::registry::AdapterRegistry;
use crate::store::LedgerStore;
use crate::types::Platform;
use crate::vault::CredentialVault;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Outcome of one sync attempt. Ephemeral; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub platform: Platform,
    pub transactions_added: u32,
    pub transactions_updated: u32,
    pub errors: Vec<String>,
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Scheduling hint only; nothing in the engine acts on it.
    pub next_sync_at: DateTime<Utc>,
}

pub struct SyncOrchestrator {
    store: LedgerStore,
    vault: CredentialVault,
    registry: AdapterRegistry,
    clock: SyncClock,
    sync_lookback_days: i64,
    resync_minutes: i64,
    retry_minutes: i64,
}

impl SyncOrchestrator {
    pub fn new(
        store: LedgerStore,
        vault: CredentialVault,
        registry: AdapterRegistry,
        config: &EngineConfig,
    ) -> Self {
        Self {
            store,
            vault,
            registry,
            clock: SyncClock::system(),
            sync_lookback_days: config.sync_lookback_days,
            resync_minutes: config.resync_minutes,
            retry_minutes: config.retry_minutes,
        }
    }

    /// Replace the clock. Test harnesses pin time with this.
    pub fn with_clock(mut self, clock: SyncClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    /// Register (or rotate the credentials of) an integration.
    ///
    /// Authentication runs against the live provider before anything is
    /// written; a rejected credential set leaves no config row behind.
    /// `settings` is the per-integration settings object; `None` stores
    /// an empty object.
    pub fn add_integration(
        &self,
        venture_id: &str,
        platform: Platform,
        credentials: &Credentials,
        settings: Option<&serde_json::Value>,
    ) -> EngineResult<String> {
        let mut adapter = self.registry.create(platform)?;
        if !adapter.authenticate(credentials)? {
            return Err(EngineError::Authentication { platform });
        }
        adapter.disconnect();

        let blob = self.vault.encrypt(credentials)?;
        let settings = settings.cloned().unwrap_or_else(|| serde_json::json!({}));
        let now = self.clock.now();
        let id = self
            .store
            .upsert_integration(venture_id, platform, &blob, &settings, now)?;
        log::info!("integration added: venture={venture_id} platform={platform}");
        Ok(id)
    }

    /// Soft-delete an integration. The provider-side disconnect is
    /// best-effort; the row is marked inactive regardless. Ledger rows
    /// are left untouched.
    pub fn remove_integration(&self, venture_id: &str, platform: Platform) -> EngineResult<()> {
        match self.registry.create(platform) {
            Ok(mut adapter) => adapter.disconnect(),
            Err(e) => log::warn!("disconnect skipped for {platform}: {e}"),
        }

        let now = self.clock.now();
        if !self.store.deactivate_integration(venture_id, platform, now)? {
            return Err(EngineError::IntegrationNotFound { platform });
        }
        log::info!("integration removed: venture={venture_id} platform={platform}");
        Ok(())
    }

    /// Run one sync attempt for a (venture, platform) pair.
    ///
    /// A transport failure during fetch aborts the attempt: no ledger
    /// writes from it survive and `last_sync_at` does not move, so the
    /// next attempt re-fetches the same window. Per-record reconcile
    /// failures are collected into the result instead of aborting.
    pub fn sync_integration(
        &self,
        venture_id: &str,
        platform: Platform,
    ) -> EngineResult<SyncResult> {
        let row = self
            .store
            .active_integration(venture_id, platform)?
            .ok_or(EngineError::IntegrationNotFound { platform })?;

        let credentials = self
            .vault
            .decrypt(&row.encrypted_credentials)
            .map_err(|e| match e {
                EngineError::Configuration(_) => e,
                _ => EngineError::CredentialRetrieval,
            })?;

        let mut adapter = self.registry.create(platform)?;
        if !adapter.authenticate(&credentials)? {
            return Err(EngineError::Authentication { platform });
        }

        let now = self.clock.now();
        let window_start = row
            .last_sync_at
            .unwrap_or(now - Duration::days(self.sync_lookback_days));
        log::info!(
            "sync start: venture={venture_id} platform={platform} window={window_start}..{now}"
        );

        let records = match adapter.get_transactions(window_start, now) {
            Ok(records) => records,
            Err(e) => {
                // Faster retry hint; the high-water mark stays put.
                let retry_at = now + Duration::minutes(self.retry_minutes);
                self.store.set_next_sync(&row.id, retry_at, now)?;
                return Err(e);
            }
        };

        let mut result = SyncResult {
            platform,
            transactions_added: 0,
            transactions_updated: 0,
            errors: Vec::new(),
            last_sync_at: Some(now),
            next_sync_at: now + Duration::minutes(self.resync_minutes),
        };

        for record in &records {
            match self.reconcile_record(venture_id, platform, record, now) {
                Ok(true) => result.transactions_added += 1,
                Ok(false) => result.transactions_updated += 1,
                Err(message) => {
                    log::warn!("reconcile failed: platform={platform} err={message}");
                    result.errors.push(message);
                }
            }
        }

        self.store
            .set_last_sync(&row.id, now, result.next_sync_at)?;
        log::info!(
            "sync done: venture={venture_id} platform={platform} added={} updated={} errors={}",
            result.transactions_added,
            result.transactions_updated,
            result.errors.len()
        );
        Ok(result)
    }

    /// Sync every enabled integration for a venture. A failure on one
    /// platform is captured into its own result; the others still run.
    pub fn sync_all_integrations(&self, venture_id: &str) -> EngineResult<Vec<SyncResult>> {
        let rows = self.store.sync_enabled_integrations(venture_id)?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            match self.sync_integration(venture_id, row.platform) {
                Ok(result) => results.push(result),
                Err(e) => {
                    let now = self.clock.now();
                    results.push(SyncResult {
                        platform: row.platform,
                        transactions_added: 0,
                        transactions_updated: 0,
                        errors: vec![e.to_string()],
                        last_sync_at: row.last_sync_at,
                        next_sync_at: now + Duration::minutes(self.retry_minutes),
                    });
                }
            }
        }
        Ok(results)
    }

    /// Verify a webhook delivery and return its parsed payload for the
    /// downstream ledger consumer.
    pub fn handle_webhook(
        &self,
        platform: Platform,
        payload: &[u8],
        signature: &str,
    ) -> EngineResult<serde_json::Value> {
        let adapter = self.registry.create(platform)?;
        if !adapter.validate_webhook(payload, signature) {
            return Err(EngineError::InvalidSignature);
        }
        let event: serde_json::Value = serde_json::from_slice(payload)?;
        log::debug!("webhook accepted: platform={platform}");
        Ok(event)
    }

    /// Insert-or-update one record. Returns true when the record was
    /// new. The existence check decides the count; the constraint-
    /// guarded upsert resolves any race with an overlapping sync.
    fn reconcile_record(
        &self,
        venture_id: &str,
        platform: Platform,
        record: &NormalizedTransaction,
        now: DateTime<Utc>,
    ) -> Result<bool, String> {
        if record.external_id.trim().is_empty() {
            return Err(format!(
                "record with empty external id skipped (category {})",
                record.category
            ));
        }
        let existed = self
            .store
            .find_transaction(venture_id, platform, &record.external_id)
            .map_err(|e| format!("{}: {e}", record.external_id))?
            .is_some();
        self.store
            .upsert_transaction(venture_id, platform, record, now)
            .map_err(|e| format!("{}: {e}", record.external_id))?;
        Ok(!existed)
    }
}
