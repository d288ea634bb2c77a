//! Adapter registry — the closed platform → adapter dispatch table.
//!
//! Built once at startup and never mutated afterwards. Each `create`
//! call hands out a fresh adapter instance so one instance never serves
//! two credential sets (adapters carry per-instance auth state).
//! Test harnesses substitute bindings through the builder before the
//! orchestrator is constructed, never through global state.

use crate::adapter::PlatformAdapter;
use crate::adapters::{
    GoCardlessAdapter, PaypalAdapter, SquareAdapter, StripeAdapter, WiseAdapter,
};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::transport::HttpTransport;
use crate::types::Platform;
use std::collections::HashMap;

pub type AdapterFactory = Box<dyn Fn() -> Box<dyn PlatformAdapter> + Send + Sync>;

pub struct AdapterRegistry {
    bindings: HashMap<Platform, AdapterFactory>,
}

impl AdapterRegistry {
    /// An empty registry; every resolution fails with
    /// `UnsupportedPlatform`. Used as a builder base in tests.
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// The production table: all five platforms bound to their HTTP
    /// adapters, wired with the config's base URLs and webhook secrets.
    pub fn with_defaults(config: &EngineConfig) -> EngineResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        let stripe_url = config.base_url(Platform::Stripe, StripeAdapter::BASE_URL);
        let stripe_secret = config.webhook_secret(Platform::Stripe);
        let stripe_client = client.clone();

        let paypal_url = config.base_url(Platform::Paypal, PaypalAdapter::BASE_URL);
        let paypal_secret = config.webhook_secret(Platform::Paypal);
        let paypal_client = client.clone();

        let square_url = config.base_url(Platform::Square, SquareAdapter::BASE_URL);
        let square_secret = config.webhook_secret(Platform::Square);
        let square_client = client.clone();

        let wise_url = config.base_url(Platform::Wise, WiseAdapter::BASE_URL);
        let wise_secret = config.webhook_secret(Platform::Wise);
        let wise_client = client.clone();

        let gc_url = config.base_url(Platform::Gocardless, GoCardlessAdapter::BASE_URL);
        let gc_secret = config.webhook_secret(Platform::Gocardless);
        let gc_client = client;

        Ok(Self::empty()
            .bind(Platform::Stripe, move || {
                let transport = HttpTransport::with_client(stripe_client.clone(), &stripe_url);
                Box::new(StripeAdapter::new(Box::new(transport), stripe_secret.clone()))
            })
            .bind(Platform::Paypal, move || {
                let transport = HttpTransport::with_client(paypal_client.clone(), &paypal_url);
                Box::new(PaypalAdapter::new(Box::new(transport), paypal_secret.clone()))
            })
            .bind(Platform::Square, move || {
                let transport = HttpTransport::with_client(square_client.clone(), &square_url);
                Box::new(SquareAdapter::new(Box::new(transport), square_secret.clone()))
            })
            .bind(Platform::Wise, move || {
                let transport = HttpTransport::with_client(wise_client.clone(), &wise_url);
                Box::new(WiseAdapter::new(Box::new(transport), wise_secret.clone()))
            })
            .bind(Platform::Gocardless, move || {
                let transport = HttpTransport::with_client(gc_client.clone(), &gc_url);
                Box::new(GoCardlessAdapter::new(Box::new(transport), gc_secret.clone()))
            }))
    }

    /// Bind (or rebind) a platform to a factory. Builder-style; only
    /// called while the table is being assembled.
    pub fn bind<F>(mut self, platform: Platform, factory: F) -> Self
    where
        F: Fn() -> Box<dyn PlatformAdapter> + Send + Sync + 'static,
    {
        self.bindings.insert(platform, Box::new(factory));
        self
    }

    pub fn supports(&self, platform: Platform) -> bool {
        self.bindings.contains_key(&platform)
    }

    /// Hand out a fresh, unauthenticated adapter for `platform`.
    pub fn create(&self, platform: Platform) -> EngineResult<Box<dyn PlatformAdapter>> {
        self.bindings
            .get(&platform)
            .map(|factory| factory())
            .ok_or_else(|| EngineError::UnsupportedPlatform(platform.to_string()))
    }
}
