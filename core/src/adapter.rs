//! Platform adapter contract.
//!
//! RULE: Every payment platform implements PlatformAdapter.
//! Adapters own provider-specific normalization (units, signs, status
//! tables, categories) and never touch the vault or the store.
//!
//! State machine per instance:
//!   Unauthenticated (initial) → Authenticated (authenticate() == true)
//!   → Disconnected (disconnect(), terminal until re-authenticate).
//! One instance serves one credential set; the registry hands out a
//! fresh instance per logical sync.

use crate::error::EngineResult;
use crate::types::{Platform, TransactionStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Decrypted provider credentials, shape varies per platform.
pub type Credentials = serde_json::Value;

/// A provider transaction normalized into the single ledger shape.
///
/// `amount` is signed, in major currency units: positive = inflow,
/// negative = outflow (refunds, payouts, fee-bearing transfers).
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedTransaction {
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
    pub metadata: serde_json::Value,
}

/// Read-only account diagnostics returned by `get_account_info`.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub platform: Platform,
    pub account_id: Option<String>,
    pub display_name: Option<String>,
    pub balances: Vec<AccountBalance>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountBalance {
    pub currency: String,
    pub available: f64,
    pub pending: f64,
}

/// The contract every platform adapter must fulfill.
pub trait PlatformAdapter: Send {
    fn platform(&self) -> Platform;

    /// Parse and store credential fields without a network round-trip.
    ///
    /// Used by the webhook path, which only needs the webhook secret.
    /// Does not change the authentication state.
    fn configure(&mut self, credentials: &Credentials);

    /// Establish an authenticated client.
    ///
    /// Returns `Ok(false)` when the provider rejects the credentials or
    /// a required field is missing — a transport failure (DNS, timeout)
    /// propagates as an error instead, so callers can distinguish "bad
    /// credentials" from "provider unreachable".
    fn authenticate(&mut self, credentials: &Credentials) -> EngineResult<bool>;

    /// Fetch and normalize every financial event in `[start, end]`.
    ///
    /// Fails with `NotAuthenticated` unless `authenticate` has succeeded
    /// on this instance since the last `disconnect`.
    fn get_transactions(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<Vec<NormalizedTransaction>>;

    /// Provider-specific account summary. Side-effect-free.
    fn get_account_info(&self) -> EngineResult<AccountSummary>;

    /// Validate a provider webhook signature.
    ///
    /// Returns `false` (never an error) when the configured webhook
    /// secret is absent.
    fn validate_webhook(&self, payload: &[u8], signature: &str) -> bool;

    /// Clear in-memory auth state. Idempotent.
    fn disconnect(&mut self);
}

/// Shared auth-state bookkeeping for adapter implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticated,
    Disconnected,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated)
    }
}
