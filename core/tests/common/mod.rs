//! Shared harness for the integration tests: a scripted transport for
//! exercising real adapters, a scripted adapter for exercising the
//! orchestrator, and builders for an in-memory engine.
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use ledgersync_core::adapter::{
    AccountSummary, AuthState, Credentials, NormalizedTransaction, PlatformAdapter,
};
use ledgersync_core::error::{EngineError, EngineResult};
use ledgersync_core::transport::{ProviderRequest, ProviderResponse, ProviderTransport};
use ledgersync_core::types::TransactionStatus;
use ledgersync_core::{
    AdapterRegistry, CredentialVault, EngineConfig, LedgerStore, Platform, SyncClock,
    SyncOrchestrator,
};
use std::sync::Mutex;

pub const TEST_SECRET: &str = "integration-test-vault-secret";

// ── Scripted transport (for real adapters) ───────────────────────────

/// Routes requests by path substring to canned responses and records
/// every request for assertions.
pub struct MockTransport {
    routes: Vec<(String, ProviderResponse)>,
    pub requests: Mutex<Vec<ProviderRequest>>,
    fail_all: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            requests: Mutex::new(Vec::new()),
            fail_all: false,
        }
    }

    /// Every send fails with a transport error (unreachable provider).
    pub fn unreachable() -> Self {
        Self {
            routes: Vec::new(),
            requests: Mutex::new(Vec::new()),
            fail_all: true,
        }
    }

    pub fn route(mut self, path_fragment: &str, status: u16, body: serde_json::Value) -> Self {
        self.routes
            .push((path_fragment.to_string(), ProviderResponse { status, body }));
        self
    }
}

impl ProviderTransport for MockTransport {
    fn send(&self, request: ProviderRequest) -> EngineResult<ProviderResponse> {
        if self.fail_all {
            return Err(EngineError::Transport("connection refused".into()));
        }
        let hit = self
            .routes
            .iter()
            .filter(|(fragment, _)| request.path.contains(fragment.as_str()))
            .max_by_key(|(fragment, _)| fragment.len())
            .map(|(_, response)| response.clone());
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(request);
        hit.ok_or_else(|| EngineError::Transport("no route for request".into()))
    }
}

/// Hands the adapter a transport while the test keeps a handle on the
/// recorded requests.
pub struct SharedTransport(pub std::sync::Arc<MockTransport>);

impl ProviderTransport for SharedTransport {
    fn send(&self, request: ProviderRequest) -> EngineResult<ProviderResponse> {
        self.0.send(request)
    }
}

// ── Scripted adapter (for the orchestrator) ──────────────────────────

#[derive(Clone)]
pub enum AuthScript {
    Accept,
    Reject,
    Unreachable,
}

#[derive(Clone)]
pub enum FetchScript {
    Records(Vec<NormalizedTransaction>),
    Unreachable,
}

#[derive(Clone)]
pub struct MockAdapter {
    platform: Platform,
    auth: AuthScript,
    fetch: FetchScript,
    webhook_ok: bool,
    state: AuthState,
}

impl MockAdapter {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            auth: AuthScript::Accept,
            fetch: FetchScript::Records(Vec::new()),
            webhook_ok: true,
            state: AuthState::Unauthenticated,
        }
    }

    pub fn auth(mut self, auth: AuthScript) -> Self {
        self.auth = auth;
        self
    }

    pub fn fetch(mut self, fetch: FetchScript) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn webhook_ok(mut self, ok: bool) -> Self {
        self.webhook_ok = ok;
        self
    }
}

impl PlatformAdapter for MockAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn configure(&mut self, _credentials: &Credentials) {}

    fn authenticate(&mut self, _credentials: &Credentials) -> EngineResult<bool> {
        match self.auth {
            AuthScript::Accept => {
                self.state = AuthState::Authenticated;
                Ok(true)
            }
            AuthScript::Reject => Ok(false),
            AuthScript::Unreachable => Err(EngineError::Transport("dns failure".into())),
        }
    }

    fn get_transactions(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> EngineResult<Vec<NormalizedTransaction>> {
        if !self.state.is_authenticated() {
            return Err(EngineError::NotAuthenticated);
        }
        match &self.fetch {
            FetchScript::Records(records) => Ok(records.clone()),
            FetchScript::Unreachable => Err(EngineError::Transport("timeout".into())),
        }
    }

    fn get_account_info(&self) -> EngineResult<AccountSummary> {
        if !self.state.is_authenticated() {
            return Err(EngineError::NotAuthenticated);
        }
        Ok(AccountSummary {
            platform: self.platform,
            account_id: Some("acct_mock".into()),
            display_name: Some("Mock Account".into()),
            balances: Vec::new(),
        })
    }

    fn validate_webhook(&self, _payload: &[u8], _signature: &str) -> bool {
        self.webhook_ok
    }

    fn disconnect(&mut self) {
        self.state = AuthState::Disconnected;
    }
}

// ── Builders ─────────────────────────────────────────────────────────

pub fn test_vault() -> CredentialVault {
    CredentialVault::from_secret(Some(TEST_SECRET)).expect("vault construction")
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

/// An orchestrator over an in-memory store with one scripted adapter
/// bound and a clock pinned at [`fixed_now`].
pub fn engine_with(adapter: MockAdapter) -> SyncOrchestrator {
    let platform = adapter.platform();
    engine_from_registry(
        AdapterRegistry::empty().bind(platform, move || Box::new(adapter.clone())),
        LedgerStore::in_memory().expect("in-memory store"),
    )
}

pub fn engine_from_registry(registry: AdapterRegistry, store: LedgerStore) -> SyncOrchestrator {
    store.migrate().expect("migrations");
    let config = EngineConfig::default();
    SyncOrchestrator::new(store, test_vault(), registry, &config)
        .with_clock(SyncClock::fixed(fixed_now()))
}

pub fn txn(external_id: &str, amount: f64) -> NormalizedTransaction {
    NormalizedTransaction {
        external_id: external_id.to_string(),
        amount,
        currency: "USD".to_string(),
        description: format!("test transaction {external_id}"),
        occurred_at: fixed_now(),
        status: TransactionStatus::Completed,
        fees: 0.0,
        net_amount: amount,
        counterparty: None,
        category: "stripe_payment".to_string(),
        metadata: serde_json::json!({}),
    }
}

pub fn stripe_creds() -> serde_json::Value {
    serde_json::json!({ "secret_key": "sk_test_123", "webhook_secret": "whsec_test" })
}
