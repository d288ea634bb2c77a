//! Per-provider adapter implementations.
//!
//! Each adapter normalizes one provider's API into the single ledger
//! shape: major currency units, signed amounts (inflow positive),
//! the four-value status vocabulary, and `<provider>_<kind>` category
//! tags. Provider identifiers pass through into the metadata map for
//! traceability.

pub mod gocardless;
pub mod paypal;
pub mod square;
pub mod stripe;
pub mod wise;

pub use gocardless::GoCardlessAdapter;
pub use paypal::PaypalAdapter;
pub use square::SquareAdapter;
pub use stripe::StripeAdapter;
pub use wise::WiseAdapter;
