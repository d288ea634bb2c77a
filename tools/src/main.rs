//! sync-runner: command-line driver for the ledger sync engine.
//!
//! Usage:
//!   sync-runner --generate-key
//!   sync-runner --db ledger.db --venture v1 --platform stripe --add creds.json [--settings settings.json]
//!   sync-runner --db ledger.db --venture v1 --platform stripe --sync
//!   sync-runner --db ledger.db --venture v1 --sync-all
//!   sync-runner --db ledger.db --venture v1 --platform stripe --remove
//!   sync-runner --db ledger.db --venture v1 --list
//!
//! The vault secret comes from LEDGERSYNC_ENCRYPTION_KEY; per-platform
//! webhook secrets and base-URL overrides from LEDGERSYNC_<PLATFORM>_*.

use anyhow::{bail, Context, Result};
use ledgersync_core::{
    AdapterRegistry, CredentialVault, EngineConfig, LedgerStore, Platform, SyncOrchestrator,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--generate-key") {
        println!("{}", CredentialVault::generate_key());
        return Ok(());
    }

    let db = flag_value(&args, "--db").unwrap_or("ledger.db");
    let venture = flag_value(&args, "--venture")
        .context("--venture is required (except for --generate-key)")?;

    let config = EngineConfig::from_env();
    let vault = CredentialVault::from_secret(config.encryption_secret.as_deref())?;
    let registry = AdapterRegistry::with_defaults(&config)?;
    let store = LedgerStore::open(db)?;
    store.migrate()?;
    let orchestrator = SyncOrchestrator::new(store, vault, registry, &config);

    if let Some(creds_path) = flag_value(&args, "--add") {
        let platform = required_platform(&args)?;
        let raw = std::fs::read_to_string(creds_path)
            .with_context(|| format!("reading credentials file {creds_path}"))?;
        let credentials: serde_json::Value =
            serde_json::from_str(&raw).context("credentials file is not valid JSON")?;
        let settings = match flag_value(&args, "--settings") {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading settings file {path}"))?;
                Some(serde_json::from_str(&raw).context("settings file is not valid JSON")?)
            }
            None => None,
        };
        let id = orchestrator.add_integration(venture, platform, &credentials, settings.as_ref())?;
        println!("integration added: {id}");
        return Ok(());
    }

    if args.iter().any(|a| a == "--sync") {
        let platform = required_platform(&args)?;
        let result = orchestrator.sync_integration(venture, platform)?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if args.iter().any(|a| a == "--sync-all") {
        let results = orchestrator.sync_all_integrations(venture)?;
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if args.iter().any(|a| a == "--remove") {
        let platform = required_platform(&args)?;
        orchestrator.remove_integration(venture, platform)?;
        println!("integration removed: {platform}");
        return Ok(());
    }

    if args.iter().any(|a| a == "--list") {
        print_ledger(&orchestrator, venture)?;
        return Ok(());
    }

    bail!("no action given: expected one of --add, --sync, --sync-all, --remove, --list, --generate-key");
}

fn print_ledger(orchestrator: &SyncOrchestrator, venture: &str) -> Result<()> {
    let rows = orchestrator.store().transactions_for(venture)?;
    println!("=== LEDGER ({} rows) ===", rows.len());
    for row in rows {
        println!(
            "  {} | {} | {:>12.2} {} | {} | {}",
            row.occurred_at.format("%Y-%m-%d"),
            row.platform,
            row.amount,
            row.currency,
            row.status,
            row.description
        );
    }
    Ok(())
}

fn required_platform(args: &[String]) -> Result<Platform> {
    let tag = flag_value(args, "--platform").context("--platform is required for this action")?;
    Ok(tag.parse::<Platform>()?)
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
