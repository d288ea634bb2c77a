//! GoCardless adapter.
//!
//! Units: integer minor units (pence/cents).
//! Status table (payments): confirmed / paid_out → completed,
//! pending_customer_approval / pending_submission / submitted → pending,
//! failed / cancelled / customer_approval_denied → failed,
//! charged_back → refunded. Payouts: paid → completed, bounced → failed,
//! pending → pending. Unknown statuses map to pending.
//! Webhook: `Webhook-Signature` header, HMAC-SHA256 of the raw body with
//! the endpoint secret, hex-encoded.

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

const API_VERSION: &str = "2015-07-06";

pub struct GoCardlessAdapter {
    transport: Box<dyn ProviderTransport>,
    state: AuthState,
    access_token: Option<String>,
    webhook_secret: Option<String>,
    creditor_id: Option<String>,
    creditor_name: Option<String>,
}

impl GoCardlessAdapter {
    pub const BASE_URL: &'static str = "https://api.gocardless.com";

    pub fn new(transport: Box<dyn ProviderTransport>, webhook_secret: Option<String>) -> Self {
        Self {
            transport,
            state: AuthState::Unauthenticated,
            access_token: None,
            webhook_secret,
            creditor_id: None,
            creditor_name: None,
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
                "gocardless {what} fetch returned HTTP {}",
                resp.status
            )));
        }
        Ok(resp)
    }

    fn payment_status(raw: &str) -> TransactionStatus {
        match raw {
            "confirmed" | "paid_out" => TransactionStatus::Completed,
            "failed" | "cancelled" | "customer_approval_denied" => TransactionStatus::Failed,
            "charged_back" => TransactionStatus::Refunded,
            _ => TransactionStatus::Pending,
        }
    }

    fn normalize_payment(payment: &Value) -> Option<NormalizedTransaction> {
        let id = payment["id"].as_str()?.to_string();
        let currency = normalize::currency_code(payment["currency"].as_str().unwrap_or("GBP"));
        let amount = normalize::minor_to_major(payment["amount"].as_i64().unwrap_or(0), &currency);
        Some(NormalizedTransaction {
            external_id: id.clone(),
            amount,
            currency,
            description: payment["description"]
                .as_str()
                .unwrap_or("GoCardless payment")
                .to_string(),
            occurred_at: normalize::parse_rfc3339(payment["created_at"].as_str().unwrap_or(""))?,
            status: Self::payment_status(payment["status"].as_str().unwrap_or("")),
            fees: 0.0,
            net_amount: amount,
            counterparty: payment["links"]["mandate"].as_str().map(str::to_string),
            category: "gocardless_payment".to_string(),
            metadata: json!({
                "payment_id": id,
                "mandate": payment["links"]["mandate"],
                "creditor": payment["links"]["creditor"],
            }),
        })
    }

    fn normalize_refund(refund: &Value) -> Option<NormalizedTransaction> {
        let id = refund["id"].as_str()?.to_string();
        let currency = normalize::currency_code(refund["currency"].as_str().unwrap_or("GBP"));
        let amount = -normalize::minor_to_major(refund["amount"].as_i64().unwrap_or(0), &currency);
        Some(NormalizedTransaction {
            external_id: id.clone(),
            amount,
            currency,
            description: refund["reference"]
                .as_str()
                .map(|r| format!("GoCardless refund ({r})"))
                .unwrap_or_else(|| "GoCardless refund".to_string()),
            occurred_at: normalize::parse_rfc3339(refund["created_at"].as_str().unwrap_or(""))?,
            status: TransactionStatus::Refunded,
            fees: 0.0,
            net_amount: amount,
            counterparty: None,
            category: "gocardless_refund".to_string(),
            metadata: json!({
                "refund_id": id,
                "payment": refund["links"]["payment"],
            }),
        })
    }

    fn normalize_payout(payout: &Value) -> Option<NormalizedTransaction> {
        let id = payout["id"].as_str()?.to_string();
        let currency = normalize::currency_code(payout["currency"].as_str().unwrap_or("GBP"));
        let amount = -normalize::minor_to_major(payout["amount"].as_i64().unwrap_or(0), &currency);
        let fees = payout["deducted_fees"]
            .as_i64()
            .map(|f| normalize::minor_to_major(f, &currency))
            .unwrap_or(0.0);
        let status = match payout["status"].as_str().unwrap_or("") {
            "paid" => TransactionStatus::Completed,
            "bounced" => TransactionStatus::Failed,
            _ => TransactionStatus::Pending,
        };
        Some(NormalizedTransaction {
            external_id: id.clone(),
            amount,
            currency,
            description: payout["reference"]
                .as_str()
                .unwrap_or("GoCardless payout")
                .to_string(),
            occurred_at: normalize::parse_rfc3339(payout["created_at"].as_str().unwrap_or(""))?,
            status,
            fees,
            net_amount: amount,
            counterparty: None,
            category: "gocardless_payout".to_string(),
            metadata: json!({
                "payout_id": id,
                "creditor_bank_account": payout["links"]["creditor_bank_account"],
            }),
        })
    }
}

impl PlatformAdapter for GoCardlessAdapter {
    fn platform(&self) -> Platform {
        Platform::Gocardless
    }

    fn configure(&mut self, credentials: &Credentials) {
        if let Some(token) = credentials["access_token"].as_str() {
            self.access_token = Some(token.to_string());
        }
        if let Some(secret) = credentials["webhook_secret"].as_str() {
            self.webhook_secret = Some(secret.to_string());
        }
    }

    fn authenticate(&mut self, credentials: &Credentials) -> EngineResult<bool> {
        self.configure(credentials);
        let Some(token) = self.access_token.clone() else {
            return Ok(false);
        };

        let resp = self.transport.send(
            ProviderRequest::get("/creditors")
                .bearer(&token)
                .header("GoCardless-Version", API_VERSION),
        )?;
        if resp.is_auth_failure() {
            log::warn!("gocardless rejected credentials (HTTP {})", resp.status);
            return Ok(false);
        }
        if !resp.is_success() {
            return Err(EngineError::Transport(format!(
                "gocardless creditor check returned HTTP {}",
                resp.status
            )));
        }

        let first = resp.body["creditors"].as_array().and_then(|l| l.first());
        self.creditor_id = first.and_then(|c| c["id"].as_str()).map(str::to_string);
        self.creditor_name = first.and_then(|c| c["name"].as_str()).map(str::to_string);
        self.state = AuthState::Authenticated;
        Ok(true)
    }

    fn get_transactions(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<Vec<NormalizedTransaction>> {
        let token = self.require_auth()?.to_string();
        let gte = start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let lte = end.to_rfc3339_opts(SecondsFormat::Secs, true);
        let window = |req: ProviderRequest| {
            req.bearer(&token)
                .header("GoCardless-Version", API_VERSION)
                .query("created_at[gte]", &gte)
                .query("created_at[lte]", &lte)
                .query("limit", 500)
        };

        let mut out = Vec::new();
        let payments = Self::check(
            self.transport.send(window(ProviderRequest::get("/payments")))?,
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
            self.transport.send(window(ProviderRequest::get("/refunds")))?,
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

        let payouts = Self::check(
            self.transport.send(window(ProviderRequest::get("/payouts")))?,
            "payouts",
        )?;
        out.extend(
            payouts.body["payouts"]
                .as_array()
                .map(|list| {
                    list.iter()
                        .filter_map(Self::normalize_payout)
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default(),
        );

        Ok(out)
    }

    fn get_account_info(&self) -> EngineResult<AccountSummary> {
        self.require_auth()?;
        Ok(AccountSummary {
            platform: Platform::Gocardless,
            account_id: self.creditor_id.clone(),
            display_name: self.creditor_name.clone(),
            balances: Vec::new(),
        })
    }

    fn validate_webhook(&self, payload: &[u8], signature: &str) -> bool {
        let Some(secret) = &self.webhook_secret else {
            return false;
        };
        signing::verify_hmac_sha256_hex(secret.as_bytes(), payload, signature)
    }

    fn disconnect(&mut self) {
        self.access_token = None;
        self.creditor_id = None;
        self.creditor_name = None;
        self.state = AuthState::Disconnected;
    }
}
