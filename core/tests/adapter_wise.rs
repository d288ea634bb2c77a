//! Wise adapter behaviours:
//! 1. Profile-membership auth check (explicit id, fallback to first)
//! 2. Statement-line normalization: credit/debit direction, settled status
//! 3. Borderless-account balance parsing for account info
//! 4. Hex HMAC webhook validation

mod common;

use chrono::{Duration, Utc};
use common::MockTransport;
use ledgersync_core::adapters::WiseAdapter;
use ledgersync_core::signing;
use ledgersync_core::types::TransactionStatus;
use ledgersync_core::{EngineError, Platform, PlatformAdapter};
use serde_json::json;

fn profiles_route() -> MockTransport {
    MockTransport::new().route("/v1/profiles", 200, json!([{ "id": 101 }, { "id": 202 }]))
}

fn creds() -> serde_json::Value {
    json!({ "api_token": "wise_token", "profile_id": 101 })
}

// ─────────────────────────────────────────────────────────────────────
// Authentication
// ─────────────────────────────────────────────────────────────────────

#[test]
fn authenticates_when_profile_is_a_member() {
    let mut adapter = WiseAdapter::new(Box::new(profiles_route()), None);
    assert!(adapter.authenticate(&creds()).unwrap());
}

#[test]
fn profile_id_accepted_as_string_or_number() {
    let mut adapter = WiseAdapter::new(Box::new(profiles_route()), None);
    let creds = json!({ "api_token": "wise_token", "profile_id": "202" });
    assert!(adapter.authenticate(&creds).unwrap());
}

#[test]
fn unknown_profile_id_is_a_rejection() {
    let mut adapter = WiseAdapter::new(Box::new(profiles_route()), None);
    let creds = json!({ "api_token": "wise_token", "profile_id": 999 });
    assert_eq!(adapter.authenticate(&creds).unwrap(), false);
}

#[test]
fn missing_profile_id_falls_back_to_first_profile() {
    let transport = profiles_route().route(
        "/statement",
        200,
        json!({ "transactions": [] }),
    );
    let mut adapter = WiseAdapter::new(Box::new(transport), None);
    assert!(adapter
        .authenticate(&json!({ "api_token": "wise_token" }))
        .unwrap());

    // Statement requests now target the first profile from the list.
    let now = Utc::now();
    let records = adapter.get_transactions(now - Duration::days(1), now).unwrap();
    assert!(records.is_empty());
}

#[test]
fn empty_profile_list_is_a_rejection() {
    let transport = MockTransport::new().route("/v1/profiles", 200, json!([]));
    let mut adapter = WiseAdapter::new(Box::new(transport), None);
    assert_eq!(
        adapter.authenticate(&json!({ "api_token": "wise_token" })).unwrap(),
        false
    );
}

#[test]
fn rejected_token_returns_false() {
    let transport = MockTransport::new().route("/v1/profiles", 401, json!({}));
    let mut adapter = WiseAdapter::new(Box::new(transport), None);
    assert_eq!(adapter.authenticate(&creds()).unwrap(), false);
}

#[test]
fn unreachable_provider_propagates_transport_error() {
    let mut adapter = WiseAdapter::new(Box::new(MockTransport::unreachable()), None);
    assert!(matches!(
        adapter.authenticate(&creds()),
        Err(EngineError::Transport(_))
    ));
}

// ─────────────────────────────────────────────────────────────────────
// Normalization
// ─────────────────────────────────────────────────────────────────────

#[test]
fn credit_and_debit_lines_get_direction_and_category() {
    let transport = profiles_route().route(
        "/v1/profiles/101/statement",
        200,
        json!({ "transactions": [
            {
                "referenceNumber": "TRANSFER-1",
                "type": "CREDIT",
                "amount": { "value": 250.0, "currency": "EUR" },
                "totalFees": { "value": 1.2, "currency": "EUR" },
                "date": "2024-06-05T08:00:00Z",
                "details": { "type": "DEPOSIT", "description": "Invoice 42", "senderName": "ACME GmbH" }
            },
            {
                "referenceNumber": "TRANSFER-2",
                "type": "DEBIT",
                "amount": { "value": 90.0, "currency": "EUR" },
                "date": "2024-06-06T08:00:00Z",
                "details": { "type": "TRANSFER", "recipient": { "name": "Landlord" } }
            }
        ] }),
    );
    let mut adapter = WiseAdapter::new(Box::new(transport), None);
    adapter.authenticate(&creds()).unwrap();

    let now = Utc::now();
    let records = adapter.get_transactions(now - Duration::days(30), now).unwrap();
    assert_eq!(records.len(), 2);

    let credit = records.iter().find(|r| r.external_id == "TRANSFER-1").unwrap();
    assert_eq!(credit.amount, 250.0);
    assert_eq!(credit.fees, 1.2);
    assert!((credit.net_amount - 248.8).abs() < 1e-9);
    assert_eq!(credit.status, TransactionStatus::Completed);
    assert_eq!(credit.category, "wise_payment");
    assert_eq!(credit.counterparty.as_deref(), Some("ACME GmbH"));

    let debit = records.iter().find(|r| r.external_id == "TRANSFER-2").unwrap();
    assert_eq!(debit.amount, -90.0);
    assert_eq!(debit.category, "wise_payout");
    assert_eq!(debit.counterparty.as_deref(), Some("Landlord"));
}

#[test]
fn statement_fetch_before_authenticate_fails() {
    let adapter = WiseAdapter::new(Box::new(profiles_route()), None);
    let now = Utc::now();
    assert!(matches!(
        adapter.get_transactions(now - Duration::days(1), now),
        Err(EngineError::NotAuthenticated)
    ));
}

// ─────────────────────────────────────────────────────────────────────
// Account info
// ─────────────────────────────────────────────────────────────────────

#[test]
fn account_info_parses_borderless_balances() {
    let transport = profiles_route().route(
        "/v1/borderless-accounts",
        200,
        json!([{
            "id": 7000,
            "balances": [
                {
                    "currency": "eur",
                    "amount": { "value": 1050.25, "currency": "EUR" },
                    "reservedAmount": { "value": 10.0, "currency": "EUR" }
                },
                {
                    "currency": "GBP",
                    "amount": { "value": 44.0, "currency": "GBP" }
                }
            ]
        }]),
    );
    let mut adapter = WiseAdapter::new(Box::new(transport), None);
    adapter.authenticate(&creds()).unwrap();

    let info = adapter.get_account_info().unwrap();
    assert_eq!(info.platform, Platform::Wise);
    assert_eq!(info.account_id.as_deref(), Some("101"));
    assert_eq!(info.balances.len(), 2);

    let eur = info.balances.iter().find(|b| b.currency == "EUR").unwrap();
    assert_eq!(eur.available, 1050.25);
    assert_eq!(eur.pending, 10.0);

    let gbp = info.balances.iter().find(|b| b.currency == "GBP").unwrap();
    assert_eq!(gbp.available, 44.0);
    assert_eq!(gbp.pending, 0.0);
}

#[test]
fn account_info_before_authenticate_fails() {
    let adapter = WiseAdapter::new(Box::new(profiles_route()), None);
    assert!(matches!(
        adapter.get_account_info(),
        Err(EngineError::NotAuthenticated)
    ));
}

// ─────────────────────────────────────────────────────────────────────
// Webhooks
// ─────────────────────────────────────────────────────────────────────

#[test]
fn validates_hex_hmac_signature() {
    let adapter = WiseAdapter::new(Box::new(MockTransport::new()), Some("whsecret".to_string()));
    let payload = br#"{"event_type":"transfers#state-change"}"#;
    let signature = signing::hmac_sha256_hex(b"whsecret", payload);

    assert!(adapter.validate_webhook(payload, &signature));
    assert!(!adapter.validate_webhook(payload, "feedface"));
}

#[test]
fn webhook_without_secret_is_rejected_quietly() {
    let adapter = WiseAdapter::new(Box::new(MockTransport::new()), None);
    assert!(!adapter.validate_webhook(b"{}", "sig"));
}
