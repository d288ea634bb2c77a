//! Webhook entry-point behaviours:
//! 1. A valid signature yields the parsed event payload
//! 2. An invalid signature fails with the single generic error
//! 3. Unknown platforms and unparseable payloads are rejected

mod common;

use common::MockAdapter;
use ledgersync_core::{EngineError, Platform};
use serde_json::json;

#[test]
fn valid_signature_returns_parsed_event() {
    let engine = common::engine_with(MockAdapter::new(Platform::Square));
    let payload = br#"{"type":"payment.updated","data":{"id":"pay_1"}}"#;

    let event = engine
        .handle_webhook(Platform::Square, payload, "good-signature")
        .unwrap();
    assert_eq!(event["type"], "payment.updated");
    assert_eq!(event["data"]["id"], "pay_1");
}

#[test]
fn invalid_signature_is_rejected() {
    let engine = common::engine_with(MockAdapter::new(Platform::Square).webhook_ok(false));
    let err = engine
        .handle_webhook(Platform::Square, b"{}", "bad-signature")
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSignature));
    assert_eq!(err.to_string(), "Invalid webhook signature");
}

#[test]
fn unknown_platform_is_rejected_before_validation() {
    let engine = common::engine_with(MockAdapter::new(Platform::Square));
    assert!(matches!(
        engine.handle_webhook(Platform::Stripe, b"{}", "sig"),
        Err(EngineError::UnsupportedPlatform(_))
    ));
}

#[test]
fn unparseable_payload_with_valid_signature_is_an_error() {
    let engine = common::engine_with(MockAdapter::new(Platform::Square));
    assert!(matches!(
        engine.handle_webhook(Platform::Square, b"not json", "sig"),
        Err(EngineError::Serialization(_))
    ));
}

#[test]
fn webhook_needs_no_stored_integration() {
    // Signature validation uses the adapter's configured secret, not
    // per-venture credentials, so a webhook can arrive before any
    // integration exists.
    let engine = common::engine_with(MockAdapter::new(Platform::Square));
    let event = engine
        .handle_webhook(Platform::Square, json!({ "ok": true }).to_string().as_bytes(), "sig")
        .unwrap();
    assert_eq!(event["ok"], true);
}
