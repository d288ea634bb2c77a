//! Engine configuration.
//!
//! One secret feeds the credential vault; webhook signing secrets and
//! base-URL overrides are per platform (per endpoint, not per venture).

use crate::types::Platform;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Vault secret: 32-byte base64, 32-byte hex, or a passphrase.
    pub encryption_secret: Option<String>,
    /// Per-platform webhook signing secrets.
    pub webhook_secrets: HashMap<Platform, String>,
    /// Per-platform base-URL overrides (sandbox endpoints, test servers).
    pub base_urls: HashMap<Platform, String>,
    /// How far back the first sync of an integration reaches.
    pub sync_lookback_days: i64,
    /// Scheduling hint after a successful sync.
    pub resync_minutes: i64,
    /// Scheduling hint after a failed sync (faster retry).
    pub retry_minutes: i64,
    pub http_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            encryption_secret: None,
            webhook_secrets: HashMap::new(),
            base_urls: HashMap::new(),
            sync_lookback_days: 30,
            resync_minutes: 60,
            retry_minutes: 30,
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    /// Load configuration from `LEDGERSYNC_*` environment variables.
    ///
    /// `LEDGERSYNC_ENCRYPTION_KEY` supplies the vault secret;
    /// `LEDGERSYNC_<PLATFORM>_WEBHOOK_SECRET` and
    /// `LEDGERSYNC_<PLATFORM>_BASE_URL` fill the per-platform maps.
    pub fn from_env() -> Self {
        let mut config = Self {
            encryption_secret: std::env::var("LEDGERSYNC_ENCRYPTION_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            ..Self::default()
        };
        for platform in Platform::ALL {
            let tag = platform.as_str().to_ascii_uppercase();
            if let Ok(secret) = std::env::var(format!("LEDGERSYNC_{tag}_WEBHOOK_SECRET")) {
                if !secret.is_empty() {
                    config.webhook_secrets.insert(platform, secret);
                }
            }
            if let Ok(url) = std::env::var(format!("LEDGERSYNC_{tag}_BASE_URL")) {
                if !url.is_empty() {
                    config.base_urls.insert(platform, url);
                }
            }
        }
        config
    }

    pub fn webhook_secret(&self, platform: Platform) -> Option<String> {
        self.webhook_secrets.get(&platform).cloned()
    }

    pub fn base_url(&self, platform: Platform, default: &str) -> String {
        self.base_urls
            .get(&platform)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}
