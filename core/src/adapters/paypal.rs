//! PayPal adapter.
//!
//! Units: decimal strings in major units, already signed by the
//! provider (sales positive, refunds and withdrawals negative).
//! Status table: S → completed, P → pending, D → failed, V → refunded;
//! unknown codes map to pending.
//! Categories by event code family: T11xx → paypal_refund, T04xx →
//! paypal_payout, everything else → paypal_payment.
//! Webhook: HMAC-SHA256 of the raw payload keyed by the configured
//! webhook id, base64-encoded. This is a simplified stand-in for
//! PayPal's certificate-based verification, and the webhook id is not
//! a secret; treat deliveries validated this way as untrusted hints
//! and re-fetch state through the reporting API.

use crate::adapter::{
    AccountBalance, AccountSummary, AuthState, Credentials, NormalizedTransaction, PlatformAdapter,
};
use crate::error::{EngineError, EngineResult};
use crate::normalize;
use crate::signing;
use crate::transport::{ProviderRequest, ProviderTransport};
use crate::types::{Platform, TransactionStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

pub struct PaypalAdapter {
    transport: Box<dyn ProviderTransport>,
    state: AuthState,
    client_id: Option<String>,
    client_secret: Option<String>,
    webhook_id: Option<String>,
    access_token: Option<String>,
}

impl PaypalAdapter {
    pub const BASE_URL: &'static str = "https://api-m.paypal.com";

    pub fn new(transport: Box<dyn ProviderTransport>, webhook_id: Option<String>) -> Self {
        Self {
            transport,
            state: AuthState::Unauthenticated,
            client_id: None,
            client_secret: None,
            webhook_id,
            access_token: None,
        }
    }

    fn require_auth(&self) -> EngineResult<&str> {
        match (&self.state, &self.access_token) {
            (AuthState::Authenticated, Some(token)) => Ok(token),
            _ => Err(EngineError::NotAuthenticated),
        }
    }

    fn map_status(code: &str) -> TransactionStatus {
        match code {
            "S" => TransactionStatus::Completed,
            "D" => TransactionStatus::Failed,
            "V" => TransactionStatus::Refunded,
            _ => TransactionStatus::Pending,
        }
    }

    fn category_for(event_code: &str, amount: f64) -> &'static str {
        if event_code.starts_with("T11") {
            "paypal_refund"
        } else if event_code.starts_with("T04") {
            "paypal_payout"
        } else if amount < 0.0 && event_code.starts_with("T12") {
            // Chargebacks land with the refunds.
            "paypal_refund"
        } else {
            "paypal_payment"
        }
    }

    fn normalize_transaction(detail: &Value) -> Option<NormalizedTransaction> {
        let info = &detail["transaction_info"];
        let id = info["transaction_id"].as_str()?.to_string();
        let amount = normalize::parse_decimal(info["transaction_amount"]["value"].as_str()?)?;
        let currency = normalize::currency_code(
            info["transaction_amount"]["currency_code"]
                .as_str()
                .unwrap_or("USD"),
        );
        // PayPal reports fees as a negative amount.
        let fee = info["fee_amount"]["value"]
            .as_str()
            .and_then(normalize::parse_decimal)
            .unwrap_or(0.0);
        let fees = fee.abs();
        let event_code = info["transaction_event_code"].as_str().unwrap_or("");
        Some(NormalizedTransaction {
            external_id: id.clone(),
            amount,
            currency,
            description: info["transaction_subject"]
                .as_str()
                .or_else(|| info["transaction_note"].as_str())
                .unwrap_or("PayPal transaction")
                .to_string(),
            occurred_at: normalize::parse_rfc3339(
                info["transaction_initiation_date"].as_str().unwrap_or(""),
            )?,
            status: Self::map_status(info["transaction_status"].as_str().unwrap_or("")),
            fees,
            net_amount: amount + fee,
            counterparty: detail["payer_info"]["email_address"]
                .as_str()
                .map(str::to_string),
            category: Self::category_for(event_code, amount).to_string(),
            metadata: json!({
                "transaction_id": id,
                "event_code": event_code,
                "paypal_reference_id": info["paypal_reference_id"],
            }),
        })
    }
}

impl PlatformAdapter for PaypalAdapter {
    fn platform(&self) -> Platform {
        Platform::Paypal
    }

    fn configure(&mut self, credentials: &Credentials) {
        if let Some(id) = credentials["client_id"].as_str() {
            self.client_id = Some(id.to_string());
        }
        if let Some(secret) = credentials["client_secret"].as_str() {
            self.client_secret = Some(secret.to_string());
        }
        if let Some(webhook_id) = credentials["webhook_id"].as_str() {
            self.webhook_id = Some(webhook_id.to_string());
        }
    }

    fn authenticate(&mut self, credentials: &Credentials) -> EngineResult<bool> {
        self.configure(credentials);
        let (Some(id), Some(secret)) = (self.client_id.clone(), self.client_secret.clone()) else {
            return Ok(false);
        };

        let resp = self.transport.send(
            ProviderRequest::post("/v1/oauth2/token")
                .basic_auth(&id, &secret)
                .form("grant_type", "client_credentials"),
        )?;
        if resp.is_auth_failure() || resp.status == 400 {
            // PayPal answers 400 invalid_client for unknown credentials.
            log::warn!("paypal rejected credentials (HTTP {})", resp.status);
            return Ok(false);
        }
        if !resp.is_success() {
            return Err(EngineError::Transport(format!(
                "paypal token exchange returned HTTP {}",
                resp.status
            )));
        }
        let Some(token) = resp.body["access_token"].as_str() else {
            return Ok(false);
        };

        self.access_token = Some(token.to_string());
        self.state = AuthState::Authenticated;
        Ok(true)
    }

    fn get_transactions(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<Vec<NormalizedTransaction>> {
        let token = self.require_auth()?;
        let resp = self.transport.send(
            ProviderRequest::get("/v1/reporting/transactions")
                .bearer(token)
                .query("start_date", start.to_rfc3339_opts(SecondsFormat::Secs, true))
                .query("end_date", end.to_rfc3339_opts(SecondsFormat::Secs, true))
                .query("fields", "transaction_info,payer_info")
                .query("page_size", 500),
        )?;
        if resp.is_auth_failure() {
            return Err(EngineError::NotAuthenticated);
        }
        if !resp.is_success() {
            return Err(EngineError::Transport(format!(
                "paypal transaction fetch returned HTTP {}",
                resp.status
            )));
        }

        Ok(resp.body["transaction_details"]
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(Self::normalize_transaction)
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get_account_info(&self) -> EngineResult<AccountSummary> {
        let token = self.require_auth()?;
        let resp = self
            .transport
            .send(ProviderRequest::get("/v1/reporting/balances").bearer(token))?;
        if !resp.is_success() {
            return Err(EngineError::Transport(format!(
                "paypal balance fetch returned HTTP {}",
                resp.status
            )));
        }

        let balances = resp.body["balances"]
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|b| {
                        Some(AccountBalance {
                            currency: normalize::currency_code(b["currency"].as_str()?),
                            available: b["available_balance"]["value"]
                                .as_str()
                                .and_then(normalize::parse_decimal)
                                .unwrap_or(0.0),
                            pending: b["withheld_balance"]["value"]
                                .as_str()
                                .and_then(normalize::parse_decimal)
                                .unwrap_or(0.0),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(AccountSummary {
            platform: Platform::Paypal,
            account_id: resp.body["account_id"].as_str().map(str::to_string),
            display_name: None,
            balances,
        })
    }

    fn validate_webhook(&self, payload: &[u8], signature: &str) -> bool {
        let Some(webhook_id) = &self.webhook_id else {
            return false;
        };
        signing::verify_hmac_sha256_base64(webhook_id.as_bytes(), payload, signature)
    }

    fn disconnect(&mut self) {
        self.client_id = None;
        self.client_secret = None;
        self.access_token = None;
        self.state = AuthState::Disconnected;
    }
}
