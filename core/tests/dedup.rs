//! Dedup under concurrency: two engines over the same file-backed
//! database sync overlapping windows containing the same external id;
//! the uniqueness constraint must leave exactly one ledger row.

mod common;

use common::{FetchScript, MockAdapter};
use ledgersync_core::{AdapterRegistry, LedgerStore, Platform};
use std::thread;

const VENTURE: &str = "venture-1";

fn temp_db_path(tag: &str) -> std::path::PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    std::env::temp_dir().join(format!(
        "ledgersync-{tag}-{}-{nanos}.db",
        std::process::id()
    ))
}

fn engine_over(path: &std::path::Path) -> ledgersync_core::SyncOrchestrator {
    let records = vec![
        common::txn("tx_shared", 100.0),
        common::txn("tx_other", 25.0),
    ];
    let registry = AdapterRegistry::empty().bind(Platform::Stripe, move || {
        Box::new(
            MockAdapter::new(Platform::Stripe).fetch(FetchScript::Records(records.clone())),
        )
    });
    let store = LedgerStore::open(path.to_str().unwrap()).unwrap();
    common::engine_from_registry(registry, store)
}

#[test]
fn overlapping_syncs_leave_exactly_one_row_per_external_id() {
    let path = temp_db_path("dedup");

    let first = engine_over(&path);
    let second = engine_over(&path);
    first
        .add_integration(VENTURE, Platform::Stripe, &common::stripe_creds(), None)
        .unwrap();

    let handles = [
        thread::spawn(move || first.sync_integration(VENTURE, Platform::Stripe)),
        thread::spawn(move || second.sync_integration(VENTURE, Platform::Stripe)),
    ];
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.join().unwrap().unwrap());
    }

    let store = LedgerStore::open(path.to_str().unwrap()).unwrap();
    assert_eq!(store.transaction_count(VENTURE).unwrap(), 2);
    let rows = store.transactions_for(VENTURE).unwrap();
    assert_eq!(
        rows.iter().filter(|r| r.external_id == "tx_shared").count(),
        1
    );

    // Between the two racing syncs every record is accounted for once
    // as an add; the loser of each race reports an update.
    let added: u32 = results.iter().map(|r| r.transactions_added).sum();
    let updated: u32 = results.iter().map(|r| r.transactions_updated).sum();
    assert_eq!(added + updated, 4);
    assert!(added >= 2, "each external id is added at least once");

    drop(store);
    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(path.with_extension("db-wal"));
    let _ = std::fs::remove_file(path.with_extension("db-shm"));
}

#[test]
fn sequential_engines_share_the_high_water_mark() {
    let path = temp_db_path("hwm");

    let first = engine_over(&path);
    first
        .add_integration(VENTURE, Platform::Stripe, &common::stripe_creds(), None)
        .unwrap();
    first.sync_integration(VENTURE, Platform::Stripe).unwrap();

    let second = engine_over(&path);
    let result = second.sync_integration(VENTURE, Platform::Stripe).unwrap();
    assert_eq!(result.transactions_added, 0);
    assert_eq!(result.transactions_updated, 2);

    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(path.with_extension("db-wal"));
    let _ = std::fs::remove_file(path.with_extension("db-shm"));
}
