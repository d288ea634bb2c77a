//! Square adapter behaviours:
//! 1. Location-list auth check and default-location capture
//! 2. Payment / refund normalization with processing-fee summation
//! 3. Base64 HMAC webhook validation with the signature key

mod common;

use chrono::{Duration, Utc};
use common::MockTransport;
use ledgersync_core::adapters::SquareAdapter;
use ledgersync_core::signing;
use ledgersync_core::types::TransactionStatus;
use ledgersync_core::{EngineError, PlatformAdapter};
use serde_json::json;

fn creds() -> serde_json::Value {
    json!({ "access_token": "sq_token", "webhook_signature_key": "sigkey" })
}

fn locations_route() -> MockTransport {
    MockTransport::new().route(
        "/v2/locations",
        200,
        json!({ "locations": [{ "id": "L1", "name": "Main Store" }] }),
    )
}

// ─────────────────────────────────────────────────────────────────────
// Authentication
// ─────────────────────────────────────────────────────────────────────

#[test]
fn authenticates_and_captures_default_location() {
    let mut adapter = SquareAdapter::new(Box::new(locations_route()), None);
    assert!(adapter.authenticate(&creds()).unwrap());

    let info = adapter.get_account_info().unwrap();
    assert_eq!(info.account_id.as_deref(), Some("L1"));
    assert_eq!(info.display_name.as_deref(), Some("Main Store"));
}

#[test]
fn explicit_location_id_is_kept() {
    let mut adapter = SquareAdapter::new(Box::new(locations_route()), None);
    let creds = json!({ "access_token": "sq_token", "location_id": "L9" });
    adapter.authenticate(&creds).unwrap();
    assert_eq!(adapter.get_account_info().unwrap().account_id.as_deref(), Some("L9"));
}

#[test]
fn account_info_before_authenticate_fails() {
    let adapter = SquareAdapter::new(Box::new(locations_route()), None);
    assert!(matches!(
        adapter.get_account_info(),
        Err(EngineError::NotAuthenticated)
    ));
}

#[test]
fn rejected_token_returns_false() {
    let transport = MockTransport::new().route("/v2/locations", 401, json!({}));
    let mut adapter = SquareAdapter::new(Box::new(transport), None);
    assert_eq!(adapter.authenticate(&creds()).unwrap(), false);
}

#[test]
fn missing_access_token_returns_false() {
    let mut adapter = SquareAdapter::new(Box::new(locations_route()), None);
    assert_eq!(adapter.authenticate(&json!({})).unwrap(), false);
}

#[test]
fn unreachable_provider_propagates_transport_error() {
    let mut adapter = SquareAdapter::new(Box::new(MockTransport::unreachable()), None);
    assert!(matches!(
        adapter.authenticate(&creds()),
        Err(EngineError::Transport(_))
    ));
}

// ─────────────────────────────────────────────────────────────────────
// Normalization
// ─────────────────────────────────────────────────────────────────────

#[test]
fn normalizes_payments_and_refunds() {
    let transport = locations_route()
        .route(
            "/v2/payments",
            200,
            json!({ "payments": [{
                "id": "pay_1",
                "amount_money": { "amount": 1850, "currency": "USD" },
                "processing_fee": [
                    { "amount_money": { "amount": 30, "currency": "USD" } },
                    { "amount_money": { "amount": 24, "currency": "USD" } }
                ],
                "status": "COMPLETED",
                "created_at": "2024-06-02T09:15:00Z",
                "note": "lunch order",
                "buyer_email_address": "buyer@example.com",
                "order_id": "ord_1",
                "location_id": "L1"
            }] }),
        )
        .route(
            "/v2/refunds",
            200,
            json!({ "refunds": [{
                "id": "ref_1",
                "amount_money": { "amount": 500, "currency": "USD" },
                "status": "COMPLETED",
                "created_at": "2024-06-03T12:00:00Z",
                "payment_id": "pay_0",
                "reason": "item returned"
            }] }),
        );
    let mut adapter = SquareAdapter::new(Box::new(transport), None);
    adapter.authenticate(&creds()).unwrap();

    let now = Utc::now();
    let records = adapter.get_transactions(now - Duration::days(30), now).unwrap();
    assert_eq!(records.len(), 2);

    let payment = records.iter().find(|r| r.external_id == "pay_1").unwrap();
    assert_eq!(payment.amount, 18.5);
    assert!((payment.fees - 0.54).abs() < 1e-9);
    assert!((payment.net_amount - 17.96).abs() < 1e-9);
    assert_eq!(payment.status, TransactionStatus::Completed);
    assert_eq!(payment.category, "square_payment");
    assert_eq!(payment.counterparty.as_deref(), Some("buyer@example.com"));

    let refund = records.iter().find(|r| r.external_id == "ref_1").unwrap();
    assert_eq!(refund.amount, -5.0);
    assert_eq!(refund.status, TransactionStatus::Refunded);
    assert_eq!(refund.category, "square_refund");
    assert!(refund.description.contains("item returned"));
}

#[test]
fn payment_status_table_covers_failure_and_unknown() {
    let transport = locations_route()
        .route(
            "/v2/payments",
            200,
            json!({ "payments": [
                { "id": "p_f", "amount_money": { "amount": 100, "currency": "USD" },
                  "status": "CANCELED", "created_at": "2024-06-01T00:00:00Z" },
                { "id": "p_a", "amount_money": { "amount": 100, "currency": "USD" },
                  "status": "APPROVED", "created_at": "2024-06-01T00:00:00Z" }
            ] }),
        )
        .route("/v2/refunds", 200, json!({ "refunds": [] }));
    let mut adapter = SquareAdapter::new(Box::new(transport), None);
    adapter.authenticate(&creds()).unwrap();

    let now = Utc::now();
    let records = adapter.get_transactions(now - Duration::days(1), now).unwrap();
    let failed = records.iter().find(|r| r.external_id == "p_f").unwrap();
    let approved = records.iter().find(|r| r.external_id == "p_a").unwrap();
    assert_eq!(failed.status, TransactionStatus::Failed);
    assert_eq!(approved.status, TransactionStatus::Pending);
}

// ─────────────────────────────────────────────────────────────────────
// Webhooks
// ─────────────────────────────────────────────────────────────────────

#[test]
fn validates_base64_hmac_with_signature_key() {
    let adapter = SquareAdapter::new(Box::new(MockTransport::new()), Some("sigkey".to_string()));
    let payload = br#"{"type":"payment.updated"}"#;
    let signature = signing::hmac_sha256_base64(b"sigkey", payload);

    assert!(adapter.validate_webhook(payload, &signature));
    assert!(!adapter.validate_webhook(b"tampered", &signature));
}

#[test]
fn webhook_without_signature_key_is_rejected_quietly() {
    let adapter = SquareAdapter::new(Box::new(MockTransport::new()), None);
    assert!(!adapter.validate_webhook(b"{}", "sig"));
}
