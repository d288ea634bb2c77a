//! Square adapter.
//!
//! Units: integer minor units inside money objects.
//! Status table (payments): COMPLETED → completed, APPROVED / PENDING →
//! pending, FAILED / CANCELED → failed; refunds: COMPLETED → refunded,
//! PENDING → pending, REJECTED / FAILED → failed. Unknown statuses map
//! to pending.
//! Webhook: HMAC-SHA256 of the raw payload with the subscription
//! signature key, base64-encoded.

use crate::adapter::{
    AccountSummary, AuthState, Credentials, NormalizedTransaction, PlatformAdapter,
};
use crate::error::{EngineError, EngineResult};
use crate::normalize;
use crate::signing;
use crate::transport::{ProviderRequest, ProviderResponse, ProviderTransport};
use crate::types::{Platform, TransactionStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

pub struct SquareAdapter {
    transport: Box<dyn ProviderTransport>,
    state: AuthState,
    access_token: Option<String>,
    location_id: Option<String>,
    location_name: Option<String>,
    signature_key: Option<String>,
}

impl SquareAdapter {
    pub const BASE_URL: &'static str = "https://connect.squareup.com";

    pub fn new(transport: Box<dyn ProviderTransport>, signature_key: Option<String>) -> Self {
        Self {
            transport,
            state: AuthState::Unauthenticated,
            access_token: None,
            location_id: None,
            location_name: None,
            signature_key,
        }
    }

    fn require_auth(&self) -> EngineResult<&str> {
        match (&self.state, &self.access_token) {
            (AuthState::Authenticated, Some(token)) => Ok(token),
            _ => Err(EngineError::NotAuthenticated),
        }
    }

    fn check(resp: ProviderResponse, what: &str) -> EngineResult<ProviderResponse> {
        if resp.is_auth_failure() {
            return Err(EngineError::NotAuthenticated);
        }
        if !resp.is_success() {
            return Err(EngineError::Transport(format!(
                "square {what} fetch returned HTTP {}",
                resp.status
            )));
        }
        Ok(resp)
    }

    fn payment_status(raw: &str) -> TransactionStatus {
        match raw {
            "COMPLETED" => TransactionStatus::Completed,
            "FAILED" | "CANCELED" => TransactionStatus::Failed,
            _ => TransactionStatus::Pending,
        }
    }

    fn normalize_payment(payment: &Value) -> Option<NormalizedTransaction> {
        let id = payment["id"].as_str()?.to_string();
        let money = &payment["amount_money"];
        let currency = normalize::currency_code(money["currency"].as_str().unwrap_or("USD"));
        let amount = normalize::minor_to_major(money["amount"].as_i64().unwrap_or(0), &currency);
        let fees = payment["processing_fee"]
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|f| f["amount_money"]["amount"].as_i64())
                    .map(|minor| normalize::minor_to_major(minor, &currency))
                    .sum()
            })
            .unwrap_or(0.0);
        Some(NormalizedTransaction {
            external_id: id.clone(),
            amount,
            currency,
            description: payment["note"]
                .as_str()
                .unwrap_or("Square payment")
                .to_string(),
            occurred_at: normalize::parse_rfc3339(payment["created_at"].as_str().unwrap_or(""))?,
            status: Self::payment_status(payment["status"].as_str().unwrap_or("")),
            fees,
            net_amount: amount - fees,
            counterparty: payment["buyer_email_address"].as_str().map(str::to_string),
            category: "square_payment".to_string(),
            metadata: json!({
                "payment_id": id,
                "order_id": payment["order_id"],
                "location_id": payment["location_id"],
            }),
        })
    }

    fn normalize_refund(refund: &Value) -> Option<NormalizedTransaction> {
        let id = refund["id"].as_str()?.to_string();
        let money = &refund["amount_money"];
        let currency = normalize::currency_code(money["currency"].as_str().unwrap_or("USD"));
        let amount = -normalize::minor_to_major(money["amount"].as_i64().unwrap_or(0), &currency);
        let status = match refund["status"].as_str().unwrap_or("") {
            "COMPLETED" => TransactionStatus::Refunded,
            "REJECTED" | "FAILED" => TransactionStatus::Failed,
            _ => TransactionStatus::Pending,
        };
        Some(NormalizedTransaction {
            external_id: id.clone(),
            amount,
            currency,
            description: refund["reason"]
                .as_str()
                .map(|r| format!("Square refund ({r})"))
                .unwrap_or_else(|| "Square refund".to_string()),
            occurred_at: normalize::parse_rfc3339(refund["created_at"].as_str().unwrap_or(""))?,
            status,
            fees: 0.0,
            net_amount: amount,
            counterparty: None,
            category: "square_refund".to_string(),
            metadata: json!({
                "refund_id": id,
                "payment_id": refund["payment_id"],
            }),
        })
    }
}

impl PlatformAdapter for SquareAdapter {
    fn platform(&self) -> Platform {
        Platform::Square
    }

    fn configure(&mut self, credentials: &Credentials) {
        if let Some(token) = credentials["access_token"].as_str() {
            self.access_token = Some(token.to_string());
        }
        if let Some(location) = credentials["location_id"].as_str() {
            self.location_id = Some(location.to_string());
        }
        if let Some(key) = credentials["webhook_signature_key"].as_str() {
            self.signature_key = Some(key.to_string());
        }
    }

    fn authenticate(&mut self, credentials: &Credentials) -> EngineResult<bool> {
        self.configure(credentials);
        let Some(token) = self.access_token.clone() else {
            return Ok(false);
        };

        let resp = self
            .transport
            .send(ProviderRequest::get("/v2/locations").bearer(&token))?;
        if resp.is_auth_failure() {
            log::warn!("square rejected credentials (HTTP {})", resp.status);
            return Ok(false);
        }
        if !resp.is_success() {
            return Err(EngineError::Transport(format!(
                "square location check returned HTTP {}",
                resp.status
            )));
        }

        let first = resp.body["locations"].as_array().and_then(|l| l.first());
        if self.location_id.is_none() {
            self.location_id = first
                .and_then(|l| l["id"].as_str())
                .map(str::to_string);
        }
        self.location_name = first
            .and_then(|l| l["name"].as_str())
            .map(str::to_string);
        self.state = AuthState::Authenticated;
        Ok(true)
    }

    fn get_transactions(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<Vec<NormalizedTransaction>> {
        let token = self.require_auth()?.to_string();
        let begin = start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let finish = end.to_rfc3339_opts(SecondsFormat::Secs, true);
        let window = |req: ProviderRequest| {
            let req = req
                .bearer(&token)
                .query("begin_time", &begin)
                .query("end_time", &finish);
            match &self.location_id {
                Some(location) => req.query("location_id", location),
                None => req,
            }
        };

        let mut out = Vec::new();
        let payments = Self::check(
            self.transport
                .send(window(ProviderRequest::get("/v2/payments")))?,
            "payments",
        )?;
        out.extend(
            payments.body["payments"]
                .as_array()
                .map(|list| {
                    list.iter()
                        .filter_map(Self::normalize_payment)
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default(),
        );

        let refunds = Self::check(
            self.transport
                .send(window(ProviderRequest::get("/v2/refunds")))?,
            "refunds",
        )?;
        out.extend(
            refunds.body["refunds"]
                .as_array()
                .map(|list| {
                    list.iter()
                        .filter_map(Self::normalize_refund)
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default(),
        );

        Ok(out)
    }

    fn get_account_info(&self) -> EngineResult<AccountSummary> {
        self.require_auth()?;
        Ok(AccountSummary {
            platform: Platform::Square,
            account_id: self.location_id.clone(),
            display_name: self.location_name.clone(),
            balances: Vec::new(),
        })
    }

    fn validate_webhook(&self, payload: &[u8], signature: &str) -> bool {
        let Some(key) = &self.signature_key else {
            return false;
        };
        signing::verify_hmac_sha256_base64(key.as_bytes(), payload, signature)
    }

    fn disconnect(&mut self) {
        self.access_token = None;
        self.location_id = None;
        self.location_name = None;
        self.state = AuthState::Disconnected;
    }
}
