//! Shared primitive types used across the entire engine.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A stable, unique identifier for a tenant ("venture").
pub type VentureId = String;

/// The closed set of supported payment platforms.
///
/// Adding a platform means adding a variant here, an adapter for it,
/// and a binding in the registry. There is no runtime registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Stripe,
    Paypal,
    Square,
    Wise,
    Gocardless,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Stripe,
        Platform::Paypal,
        Platform::Square,
        Platform::Wise,
        Platform::Gocardless,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Stripe => "stripe",
            Platform::Paypal => "paypal",
            Platform::Square => "square",
            Platform::Wise => "wise",
            Platform::Gocardless => "gocardless",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = EngineError;

    fn from_str(s: &str) -> EngineResult<Self> {
        match s {
            "stripe" => Ok(Platform::Stripe),
            "paypal" => Ok(Platform::Paypal),
            "square" => Ok(Platform::Square),
            "wise" => Ok(Platform::Wise),
            "gocardless" => Ok(Platform::Gocardless),
            other => Err(EngineError::UnsupportedPlatform(other.to_string())),
        }
    }
}

/// Normalized transaction lifecycle status.
///
/// Every provider's status vocabulary maps into these four values; the
/// mapping tables live in the individual adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Refunded => "refunded",
        }
    }

    /// Parse a stored status string. Unknown strings come back as
    /// `Pending` so a schema drift never poisons a read path.
    pub fn parse(s: &str) -> TransactionStatus {
        match s {
            "completed" => TransactionStatus::Completed,
            "failed" => TransactionStatus::Failed,
            "refunded" => TransactionStatus::Refunded,
            _ => TransactionStatus::Pending,
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
