//! Shared normalization helpers for provider payloads.
//!
//! RULE: adapters never hand-roll unit conversion or timestamp parsing.
//! Everything that turns provider JSON into ledger values goes through
//! these functions so sign and unit conventions stay uniform.

use chrono::{DateTime, TimeZone, Utc};

/// ISO-4217 currencies with no minor unit. Providers that bill in minor
/// units (Stripe, Square) send these amounts already in major units.
const ZERO_DECIMAL: [&str; 8] = ["JPY", "KRW", "VND", "CLP", "ISK", "UGX", "RWF", "XOF"];

/// Convert an integer minor-unit amount to major currency units.
pub fn minor_to_major(amount: i64, currency: &str) -> f64 {
    if ZERO_DECIMAL.contains(&currency.to_ascii_uppercase().as_str()) {
        amount as f64
    } else {
        amount as f64 / 100.0
    }
}

/// Upper-case a provider currency code.
pub fn currency_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Parse a decimal string amount ("12.34", "-3.00") as sent by providers
/// that bill in major units (PayPal, Wise).
pub fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an RFC 3339 timestamp, tolerating a trailing offset or `Z`.
pub fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a Unix-epoch seconds timestamp (Stripe style).
pub fn parse_epoch_seconds(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_units_divide_by_100() {
        assert_eq!(minor_to_major(12345, "usd"), 123.45);
        assert_eq!(minor_to_major(-500, "EUR"), -5.0);
    }

    #[test]
    fn zero_decimal_currencies_pass_through() {
        assert_eq!(minor_to_major(1500, "JPY"), 1500.0);
        assert_eq!(minor_to_major(1500, "jpy"), 1500.0);
    }

    #[test]
    fn decimal_strings_parse() {
        assert_eq!(parse_decimal(" 12.34 "), Some(12.34));
        assert_eq!(parse_decimal("-3"), Some(-3.0));
        assert_eq!(parse_decimal("NaN"), None);
        assert_eq!(parse_decimal("twelve"), None);
    }

    #[test]
    fn timestamps_parse() {
        let dt = parse_rfc3339("2024-05-01T12:00:00Z").unwrap();
        assert_eq!(dt.timestamp(), 1714564800);
        assert_eq!(parse_epoch_seconds(1714564800), Some(dt));
        assert!(parse_rfc3339("yesterday").is_none());
    }
}
