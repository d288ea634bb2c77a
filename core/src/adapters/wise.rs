//! Wise adapter.
//!
//! Units: decimal values in major units from the statement endpoint.
//! Statement lines are settled money movement, so every record is
//! completed; direction comes from the CREDIT/DEBIT line type (credits
//! positive → wise_payment, debits negative → wise_payout).
//! Webhook: HMAC-SHA256 of the raw payload with the configured
//! signing secret, hex-encoded.

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

pub struct WiseAdapter {
    transport: Box<dyn ProviderTransport>,
    state: AuthState,
    api_token: Option<String>,
    profile_id: Option<String>,
    webhook_secret: Option<String>,
}

impl WiseAdapter {
    pub const BASE_URL: &'static str = "https://api.transferwise.com";

    pub fn new(transport: Box<dyn ProviderTransport>, webhook_secret: Option<String>) -> Self {
        Self {
            transport,
            state: AuthState::Unauthenticated,
            api_token: None,
            profile_id: None,
            webhook_secret,
        }
    }

    fn require_auth(&self) -> EngineResult<(&str, &str)> {
        match (&self.state, &self.api_token, &self.profile_id) {
            (AuthState::Authenticated, Some(token), Some(profile)) => Ok((token, profile)),
            _ => Err(EngineError::NotAuthenticated),
        }
    }

    fn normalize_line(line: &Value) -> Option<NormalizedTransaction> {
        let id = line["referenceNumber"].as_str()?.to_string();
        let line_type = line["type"].as_str().unwrap_or("");
        let currency =
            normalize::currency_code(line["amount"]["currency"].as_str().unwrap_or("USD"));
        let magnitude = line["amount"]["value"].as_f64().unwrap_or(0.0).abs();
        let (amount, category) = match line_type {
            "DEBIT" => (-magnitude, "wise_payout"),
            _ => (magnitude, "wise_payment"),
        };
        let fees = line["totalFees"]["value"].as_f64().unwrap_or(0.0).abs();
        let counterparty = line["details"]["senderName"]
            .as_str()
            .or_else(|| line["details"]["recipient"]["name"].as_str())
            .map(str::to_string);
        Some(NormalizedTransaction {
            external_id: id.clone(),
            amount,
            currency,
            description: line["details"]["description"]
                .as_str()
                .unwrap_or("Wise transfer")
                .to_string(),
            occurred_at: normalize::parse_rfc3339(line["date"].as_str().unwrap_or(""))?,
            // Statement lines are settled by definition.
            status: TransactionStatus::Completed,
            fees,
            net_amount: amount - fees,
            counterparty,
            category: category.to_string(),
            metadata: json!({
                "reference_number": id,
                "line_type": line_type,
                "detail_type": line["details"]["type"],
            }),
        })
    }
}

impl PlatformAdapter for WiseAdapter {
    fn platform(&self) -> Platform {
        Platform::Wise
    }

    fn configure(&mut self, credentials: &Credentials) {
        if let Some(token) = credentials["api_token"].as_str() {
            self.api_token = Some(token.to_string());
        }
        // Profile ids arrive as numbers or strings depending on the caller.
        match &credentials["profile_id"] {
            Value::String(s) => self.profile_id = Some(s.clone()),
            Value::Number(n) => self.profile_id = Some(n.to_string()),
            _ => {}
        }
        if let Some(secret) = credentials["webhook_secret"].as_str() {
            self.webhook_secret = Some(secret.to_string());
        }
    }

    fn authenticate(&mut self, credentials: &Credentials) -> EngineResult<bool> {
        self.configure(credentials);
        let Some(token) = self.api_token.clone() else {
            return Ok(false);
        };

        let resp = self
            .transport
            .send(ProviderRequest::get("/v1/profiles").bearer(&token))?;
        if resp.is_auth_failure() {
            log::warn!("wise rejected credentials (HTTP {})", resp.status);
            return Ok(false);
        }
        if !resp.is_success() {
            return Err(EngineError::Transport(format!(
                "wise profile check returned HTTP {}",
                resp.status
            )));
        }

        let profiles: Vec<String> = resp
            .body
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|p| p["id"].as_i64().map(|id| id.to_string()))
                    .collect()
            })
            .unwrap_or_default();
        match &self.profile_id {
            Some(wanted) if profiles.iter().any(|p| p == wanted) => {}
            Some(_) => return Ok(false),
            None => match profiles.first() {
                Some(first) => self.profile_id = Some(first.clone()),
                None => return Ok(false),
            },
        }

        self.state = AuthState::Authenticated;
        Ok(true)
    }

    fn get_transactions(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<Vec<NormalizedTransaction>> {
        let (token, profile) = self.require_auth()?;
        let resp = self.transport.send(
            ProviderRequest::get(format!("/v1/profiles/{profile}/statement"))
                .bearer(token)
                .query(
                    "intervalStart",
                    start.to_rfc3339_opts(SecondsFormat::Millis, true),
                )
                .query(
                    "intervalEnd",
                    end.to_rfc3339_opts(SecondsFormat::Millis, true),
                ),
        )?;
        if resp.is_auth_failure() {
            return Err(EngineError::NotAuthenticated);
        }
        if !resp.is_success() {
            return Err(EngineError::Transport(format!(
                "wise statement fetch returned HTTP {}",
                resp.status
            )));
        }

        Ok(resp.body["transactions"]
            .as_array()
            .map(|list| list.iter().filter_map(Self::normalize_line).collect())
            .unwrap_or_default())
    }

    fn get_account_info(&self) -> EngineResult<AccountSummary> {
        let (token, profile) = self.require_auth()?;
        let resp = self.transport.send(
            ProviderRequest::get("/v1/borderless-accounts")
                .bearer(token)
                .query("profileId", profile),
        )?;
        if !resp.is_success() {
            return Err(EngineError::Transport(format!(
                "wise account fetch returned HTTP {}",
                resp.status
            )));
        }

        let account = resp.body.as_array().and_then(|list| list.first());
        let balances = account
            .and_then(|a| a["balances"].as_array())
            .map(|list| {
                list.iter()
                    .filter_map(|b| {
                        Some(AccountBalance {
                            currency: normalize::currency_code(b["currency"].as_str()?),
                            available: b["amount"]["value"].as_f64().unwrap_or(0.0),
                            pending: b["reservedAmount"]["value"].as_f64().unwrap_or(0.0),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(AccountSummary {
            platform: Platform::Wise,
            account_id: Some(profile.to_string()),
            display_name: None,
            balances,
        })
    }

    fn validate_webhook(&self, payload: &[u8], signature: &str) -> bool {
        let Some(secret) = &self.webhook_secret else {
            return false;
        };
        signing::verify_hmac_sha256_hex(secret.as_bytes(), payload, signature)
    }

    fn disconnect(&mut self) {
        self.api_token = None;
        self.profile_id = None;
        self.state = AuthState::Disconnected;
    }
}
