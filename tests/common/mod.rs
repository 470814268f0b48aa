#![allow(dead_code)]

use nx9_pdns_backend::{
    db::{init_db, open_pool},
    Backend, BackendConfig, ResourceRecord,
};
use tempfile::TempDir;

/// A backend on a fresh database file. Keep the `TempDir` alive for the
/// duration of the test.
pub fn backend(dnssec: bool) -> (TempDir, Backend) {
    let (dir, config) = config(dnssec);
    let pool = open_pool(&config).unwrap();
    init_db(&pool).unwrap();
    (dir, Backend::new(pool, dnssec).unwrap())
}

/// A backend on a database whose schema was never provisioned.
pub fn unprovisioned_backend(dnssec: bool) -> (TempDir, Backend) {
    let (dir, config) = config(dnssec);
    let pool = open_pool(&config).unwrap();
    (dir, Backend::new(pool, dnssec).unwrap())
}

fn config(dnssec: bool) -> (TempDir, BackendConfig) {
    let dir = tempfile::tempdir().unwrap();
    let config = BackendConfig {
        db_path: dir.path().join("pdns.db").to_string_lossy().into_owned(),
        dnssec,
        pool_size: 4,
        metrics_bind: None,
    };
    (dir, config)
}

/// A direct connection to the backend's database file, for rows the
/// backend API never writes.
pub fn raw_connection(dir: &TempDir) -> rusqlite::Connection {
    rusqlite::Connection::open(dir.path().join("pdns.db")).unwrap()
}

/// Feed `records` in their own committed transaction.
pub fn seed(backend: &Backend, trxid: i64, records: &[ResourceRecord]) {
    backend.start_transaction(trxid, 0).unwrap();
    for rr in records {
        backend.feed_record(trxid, rr, "").unwrap();
    }
    backend.commit_transaction(trxid).unwrap();
}

/// Sorted contents of `records`.
pub fn contents(records: &[ResourceRecord]) -> Vec<String> {
    let mut out: Vec<String> = records.iter().map(|rr| rr.content.clone()).collect();
    out.sort();
    out
}
