//! Stripe adapter.
//!
//! Units: integer minor units (zero-decimal currencies excepted).
//! Status table: succeeded → completed (refunded flag wins), pending →
//! pending, failed → failed; payouts: paid → completed, pending /
//! in_transit → pending, failed / canceled → failed. Unknown statuses
//! map to pending.
//! Webhook: `Stripe-Signature: t=<ts>,v1=<hex>`, HMAC-SHA256 over
//! `"<ts>.<payload>"` with the endpoint signing secret.

use crate::adapter::{
    AccountBalance, AccountSummary, AuthState, Credentials, NormalizedTransaction, PlatformAdapter,
};
use crate::error::{EngineError, EngineResult};
use crate::normalize;
use crate::signing;
use crate::transport::{ProviderRequest, ProviderResponse, ProviderTransport};
use crate::types::{Platform, TransactionStatus};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

pub struct StripeAdapter {
    transport: Box<dyn ProviderTransport>,
    state: AuthState,
    secret_key: Option<String>,
    webhook_secret: Option<String>,
    account_id: Option<String>,
}

impl StripeAdapter {
    pub const BASE_URL: &'static str = "https://api.stripe.com";

    pub fn new(transport: Box<dyn ProviderTransport>, webhook_secret: Option<String>) -> Self {
        Self {
            transport,
            state: AuthState::Unauthenticated,
            secret_key: None,
            webhook_secret,
            account_id: None,
        }
    }

    fn require_auth(&self) -> EngineResult<&str> {
        match (&self.state, &self.secret_key) {
            (AuthState::Authenticated, Some(key)) => Ok(key),
            _ => Err(EngineError::NotAuthenticated),
        }
    }

    fn fetch_list(&self, resp: ProviderResponse, what: &str) -> EngineResult<Vec<Value>> {
        if resp.is_auth_failure() {
            return Err(EngineError::NotAuthenticated);
        }
        if !resp.is_success() {
            return Err(EngineError::Transport(format!(
                "stripe {what} fetch returned HTTP {}",
                resp.status
            )));
        }
        Ok(resp.body["data"].as_array().cloned().unwrap_or_default())
    }

    fn charge_status(raw: &str, refunded: bool) -> TransactionStatus {
        if refunded {
            return TransactionStatus::Refunded;
        }
        match raw {
            "succeeded" => TransactionStatus::Completed,
            "failed" => TransactionStatus::Failed,
            _ => TransactionStatus::Pending,
        }
    }

    fn payout_status(raw: &str) -> TransactionStatus {
        match raw {
            "paid" => TransactionStatus::Completed,
            "failed" | "canceled" => TransactionStatus::Failed,
            _ => TransactionStatus::Pending,
        }
    }

    fn normalize_charge(charge: &Value) -> Option<NormalizedTransaction> {
        let id = charge["id"].as_str()?.to_string();
        let currency = normalize::currency_code(charge["currency"].as_str().unwrap_or("usd"));
        let amount = normalize::minor_to_major(charge["amount"].as_i64().unwrap_or(0), &currency);
        let fees = charge["application_fee_amount"]
            .as_i64()
            .map(|f| normalize::minor_to_major(f, &currency))
            .unwrap_or(0.0);
        let refunded = charge["refunded"].as_bool().unwrap_or(false);
        Some(NormalizedTransaction {
            external_id: id.clone(),
            amount,
            currency,
            description: charge["description"]
                .as_str()
                .unwrap_or("Stripe charge")
                .to_string(),
            occurred_at: normalize::parse_epoch_seconds(charge["created"].as_i64().unwrap_or(0))?,
            status: Self::charge_status(charge["status"].as_str().unwrap_or(""), refunded),
            fees,
            net_amount: amount - fees,
            counterparty: charge["billing_details"]["name"]
                .as_str()
                .or_else(|| charge["customer"].as_str())
                .map(str::to_string),
            category: "stripe_payment".to_string(),
            metadata: json!({
                "charge_id": id,
                "payment_intent": charge["payment_intent"],
                "balance_transaction": charge["balance_transaction"],
                "customer": charge["customer"],
            }),
        })
    }

    fn normalize_refund(refund: &Value) -> Option<NormalizedTransaction> {
        let id = refund["id"].as_str()?.to_string();
        let currency = normalize::currency_code(refund["currency"].as_str().unwrap_or("usd"));
        let amount = -normalize::minor_to_major(refund["amount"].as_i64().unwrap_or(0), &currency);
        let status = match refund["status"].as_str().unwrap_or("") {
            "succeeded" => TransactionStatus::Refunded,
            "failed" | "canceled" => TransactionStatus::Failed,
            _ => TransactionStatus::Pending,
        };
        Some(NormalizedTransaction {
            external_id: id.clone(),
            amount,
            currency,
            description: refund["reason"]
                .as_str()
                .map(|r| format!("Stripe refund ({r})"))
                .unwrap_or_else(|| "Stripe refund".to_string()),
            occurred_at: normalize::parse_epoch_seconds(refund["created"].as_i64().unwrap_or(0))?,
            status,
            fees: 0.0,
            net_amount: amount,
            counterparty: None,
            category: "stripe_refund".to_string(),
            metadata: json!({
                "refund_id": id,
                "charge": refund["charge"],
                "payment_intent": refund["payment_intent"],
            }),
        })
    }

    fn normalize_payout(payout: &Value) -> Option<NormalizedTransaction> {
        let id = payout["id"].as_str()?.to_string();
        let currency = normalize::currency_code(payout["currency"].as_str().unwrap_or("usd"));
        let amount = -normalize::minor_to_major(payout["amount"].as_i64().unwrap_or(0), &currency);
        Some(NormalizedTransaction {
            external_id: id.clone(),
            amount,
            currency,
            description: payout["description"]
                .as_str()
                .unwrap_or("Stripe payout")
                .to_string(),
            occurred_at: normalize::parse_epoch_seconds(payout["created"].as_i64().unwrap_or(0))?,
            status: Self::payout_status(payout["status"].as_str().unwrap_or("")),
            fees: 0.0,
            net_amount: amount,
            counterparty: payout["destination"].as_str().map(str::to_string),
            category: "stripe_payout".to_string(),
            metadata: json!({
                "payout_id": id,
                "destination": payout["destination"],
            }),
        })
    }
}

impl PlatformAdapter for StripeAdapter {
    fn platform(&self) -> Platform {
        Platform::Stripe
    }

    fn configure(&mut self, credentials: &Credentials) {
        if let Some(key) = credentials["secret_key"].as_str() {
            self.secret_key = Some(key.to_string());
        }
        if let Some(secret) = credentials["webhook_secret"].as_str() {
            self.webhook_secret = Some(secret.to_string());
        }
    }

    fn authenticate(&mut self, credentials: &Credentials) -> EngineResult<bool> {
        self.configure(credentials);
        let Some(key) = self.secret_key.clone() else {
            return Ok(false);
        };

        let resp = self
            .transport
            .send(ProviderRequest::get("/v1/account").bearer(&key))?;
        if resp.is_auth_failure() {
            log::warn!("stripe rejected credentials (HTTP {})", resp.status);
            return Ok(false);
        }
        if !resp.is_success() {
            return Err(EngineError::Transport(format!(
                "stripe account check returned HTTP {}",
                resp.status
            )));
        }

        self.account_id = resp.body["id"].as_str().map(str::to_string);
        self.state = AuthState::Authenticated;
        Ok(true)
    }

    fn get_transactions(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<Vec<NormalizedTransaction>> {
        let key = self.require_auth()?.to_string();
        let window = |req: ProviderRequest| {
            req.bearer(&key)
                .query("created[gte]", start.timestamp())
                .query("created[lte]", end.timestamp())
                .query("limit", 100)
        };

        let mut out = Vec::new();
        let charges = self.fetch_list(
            self.transport.send(window(ProviderRequest::get("/v1/charges")))?,
            "charges",
        )?;
        out.extend(charges.iter().filter_map(Self::normalize_charge));

        let refunds = self.fetch_list(
            self.transport.send(window(ProviderRequest::get("/v1/refunds")))?,
            "refunds",
        )?;
        out.extend(refunds.iter().filter_map(Self::normalize_refund));

        let payouts = self.fetch_list(
            self.transport.send(window(ProviderRequest::get("/v1/payouts")))?,
            "payouts",
        )?;
        out.extend(payouts.iter().filter_map(Self::normalize_payout));

        Ok(out)
    }

    fn get_account_info(&self) -> EngineResult<AccountSummary> {
        let key = self.require_auth()?;
        let resp = self
            .transport
            .send(ProviderRequest::get("/v1/balance").bearer(key))?;
        if !resp.is_success() {
            return Err(EngineError::Transport(format!(
                "stripe balance fetch returned HTTP {}",
                resp.status
            )));
        }

        let read = |entries: &Value| -> Vec<(String, f64)> {
            entries
                .as_array()
                .map(|list| {
                    list.iter()
                        .filter_map(|e| {
                            let currency =
                                normalize::currency_code(e["currency"].as_str().unwrap_or("usd"));
                            let amount =
                                normalize::minor_to_major(e["amount"].as_i64()?, &currency);
                            Some((currency, amount))
                        })
                        .collect()
                })
                .unwrap_or_default()
        };
        let available = read(&resp.body["available"]);
        let pending = read(&resp.body["pending"]);

        let balances = available
            .into_iter()
            .map(|(currency, avail)| {
                let pend = pending
                    .iter()
                    .find(|(c, _)| *c == currency)
                    .map(|(_, v)| *v)
                    .unwrap_or(0.0);
                AccountBalance {
                    currency,
                    available: avail,
                    pending: pend,
                }
            })
            .collect();

        Ok(AccountSummary {
            platform: Platform::Stripe,
            account_id: self.account_id.clone(),
            display_name: None,
            balances,
        })
    }

    fn validate_webhook(&self, payload: &[u8], signature: &str) -> bool {
        let Some(secret) = &self.webhook_secret else {
            return false;
        };

        // Header format: "t=<timestamp>,v1=<hex>[,v1=...]"
        let mut timestamp: Option<&str> = None;
        let mut candidates: Vec<&str> = Vec::new();
        for part in signature.split(',') {
            match part.trim().split_once('=') {
                Some(("t", v)) => timestamp = Some(v),
                Some(("v1", v)) => candidates.push(v),
                _ => {}
            }
        }
        let Some(t) = timestamp else { return false };
        if candidates.is_empty() {
            return false;
        }

        let mut signed = Vec::with_capacity(t.len() + 1 + payload.len());
        signed.extend_from_slice(t.as_bytes());
        signed.push(b'.');
        signed.extend_from_slice(payload);

        candidates
            .iter()
            .any(|v1| signing::verify_hmac_sha256_hex(secret.as_bytes(), &signed, v1))
    }

    fn disconnect(&mut self) {
        self.secret_key = None;
        self.account_id = None;
        self.state = AuthState::Disconnected;
    }
}
