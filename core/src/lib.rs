//! Financial integration sync engine.
//!
//! Ingests activity from third-party payment platforms on behalf of a
//! venture, normalizes it into one transaction ledger, and keeps the
//! per-platform credentials encrypted at rest. Three pieces carry the
//! weight: the credential vault (AEAD custody), the platform adapters
//! (five providers behind one contract), and the sync orchestrator
//! (idempotent reconcile against the SQLite ledger).

pub mod adapter;
pub mod adapters;
pub mod clock;
pub mod config;
pub mod error;
pub mod normalize;
pub mod orchestrator;
pub mod registry;
pub mod signing;
pub mod store;
pub mod transport;
pub mod types;
pub mod vault;

pub use adapter::{
    AccountBalance, AccountSummary, Credentials, NormalizedTransaction, PlatformAdapter,
};
pub use clock::SyncClock;
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use orchestrator::{SyncOrchestrator, SyncResult};
pub use registry::AdapterRegistry;
pub use store::LedgerStore;
pub use types::{Platform, TransactionStatus, VentureId};
pub use vault::CredentialVault;
