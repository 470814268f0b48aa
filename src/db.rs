//! Database operations for the backend.
//!
//! This module owns the SQLite connection pool, provisions the schema, and
//! executes catalog statements either on a pooled connection or inside a
//! transaction that holds its own connection.

use std::sync::Arc;

use log::{debug, warn};
use metrics::increment_counter;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params_from_iter, Connection, Row};

use crate::args::Args;
use crate::catalog::QueryCatalog;
use crate::config::BackendConfig;
use crate::errors::BackendError;

/// Pool of SQLite connections.
pub type DbPool = Pool<SqliteConnectionManager>;

type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Prepared statements kept per connection.
const STATEMENT_CACHE_CAPACITY: usize = 96;

const SCHEMA: &str = r#"
BEGIN TRANSACTION;
CREATE TABLE IF NOT EXISTS domains (
  id                    INTEGER PRIMARY KEY,
  name                  VARCHAR(255) NOT NULL COLLATE NOCASE,
  master                VARCHAR(128) DEFAULT NULL,
  last_check            INTEGER DEFAULT NULL,
  type                  VARCHAR(6) NOT NULL,
  notified_serial       INTEGER DEFAULT NULL,
  account               VARCHAR(40) DEFAULT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS name_index ON domains(name);
CREATE TABLE IF NOT EXISTS records (
  id                    INTEGER PRIMARY KEY,
  domain_id             INTEGER DEFAULT NULL,
  name                  VARCHAR(255) DEFAULT NULL,
  type                  VARCHAR(10) DEFAULT NULL,
  content               VARCHAR(65535) DEFAULT NULL,
  ttl                   INTEGER DEFAULT NULL,
  prio                  INTEGER DEFAULT NULL,
  disabled              BOOLEAN DEFAULT 0,
  ordername             VARCHAR(255),
  auth                  BOOL DEFAULT 1
);
CREATE INDEX IF NOT EXISTS records_lookup_idx ON records(name, type);
CREATE INDEX IF NOT EXISTS records_lookup_id_idx ON records(domain_id, name, type);
CREATE INDEX IF NOT EXISTS records_order_idx ON records(domain_id, ordername);
CREATE TABLE IF NOT EXISTS supermasters (
  ip                    VARCHAR(64) NOT NULL,
  nameserver            VARCHAR(255) NOT NULL COLLATE NOCASE,
  account               VARCHAR(40) NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS ip_nameserver_pk ON supermasters(ip, nameserver);
CREATE TABLE IF NOT EXISTS comments (
  id                    INTEGER PRIMARY KEY,
  domain_id             INTEGER NOT NULL,
  name                  VARCHAR(255) NOT NULL,
  type                  VARCHAR(10) NOT NULL,
  modified_at           INT NOT NULL,
  account               VARCHAR(40) DEFAULT NULL,
  comment               VARCHAR(65535) NOT NULL
);
CREATE INDEX IF NOT EXISTS comments_idx ON comments(domain_id, name, type);
CREATE INDEX IF NOT EXISTS comments_order_idx ON comments (domain_id, modified_at);
CREATE TABLE IF NOT EXISTS domainmetadata (
 id                     INTEGER PRIMARY KEY,
 domain_id              INT NOT NULL,
 kind                   VARCHAR(32) COLLATE NOCASE,
 content                TEXT
);
CREATE INDEX IF NOT EXISTS domainmetaidindex ON domainmetadata(domain_id);
CREATE TABLE IF NOT EXISTS cryptokeys (
 id                     INTEGER PRIMARY KEY,
 domain_id              INT NOT NULL,
 flags                  INT NOT NULL,
 active                 BOOL,
 published              BOOL DEFAULT 1,
 content                TEXT
);
CREATE INDEX IF NOT EXISTS domainidindex ON cryptokeys(domain_id);
CREATE TABLE IF NOT EXISTS tsigkeys (
 id                     INTEGER PRIMARY KEY,
 name                   VARCHAR(255) COLLATE NOCASE,
 algorithm              VARCHAR(50) COLLATE NOCASE,
 secret                 VARCHAR(255)
);
CREATE UNIQUE INDEX IF NOT EXISTS namealgoindex ON tsigkeys(name, algorithm);
COMMIT;
"#;

/// Open the connection pool described by `config`.
///
/// Every connection the pool creates switches the database to WAL mode so
/// readers are not blocked by an open write transaction, and caches enough
/// prepared statements to hold the whole catalog.
pub fn open_pool(config: &BackendConfig) -> Result<DbPool, BackendError> {
    let manager = SqliteConnectionManager::file(&config.db_path).with_init(|conn| {
        conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);
        conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))
    });
    let pool = Pool::builder().max_size(config.pool_size).build(manager)?;
    debug!("Opened pool of {} connections to {}", config.pool_size, config.db_path);
    Ok(pool)
}

/// Initialize the backend database.
///
/// Creates the tables and indexes if they don't exist. Safe to call on an
/// already provisioned database.
pub fn init_db(pool: &DbPool) -> Result<(), BackendError> {
    let conn = pool.get()?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

fn execute_on(
    conn: &Connection,
    catalog: &QueryCatalog,
    name: &str,
    args: &Args,
) -> Result<usize, BackendError> {
    let (sql, params) = catalog.prepare(name, args)?;
    debug!("Executing {}", name);
    increment_counter!("pdns_backend_statements_total");
    let mut stmt = conn.prepare_cached(sql)?;
    Ok(stmt.execute(params_from_iter(params))?)
}

fn query_on<T, F>(
    conn: &Connection,
    catalog: &QueryCatalog,
    name: &str,
    args: &Args,
    f: F,
) -> Result<Vec<T>, BackendError>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let (sql, params) = catalog.prepare(name, args)?;
    debug!("Querying {}", name);
    increment_counter!("pdns_backend_statements_total");
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params_from_iter(params), f)?;
    let values = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(values)
}

/// Executes catalog statements against the pool.
#[derive(Clone)]
pub struct RecordStore {
    pool: DbPool,
    catalog: Arc<QueryCatalog>,
}

impl RecordStore {
    pub fn new(pool: DbPool, catalog: Arc<QueryCatalog>) -> Self {
        Self { pool, catalog }
    }

    pub fn catalog(&self) -> &QueryCatalog {
        &self.catalog
    }

    /// Execute a mutating statement on a pooled connection.
    ///
    /// # Returns
    /// The number of rows changed.
    pub fn execute(&self, name: &str, args: &Args) -> Result<usize, BackendError> {
        let conn = self.pool.get()?;
        execute_on(&conn, &self.catalog, name, args)
    }

    /// Run a query on a pooled connection and map every row with `f`.
    pub fn query<T, F>(&self, name: &str, args: &Args, f: F) -> Result<Vec<T>, BackendError>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.pool.get()?;
        query_on(&conn, &self.catalog, name, args, f)
    }

    /// Run a query and return only its first row.
    pub fn query_one<T, F>(&self, name: &str, args: &Args, f: F) -> Result<Option<T>, BackendError>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        Ok(self.query(name, args, f)?.into_iter().next())
    }

    /// Begin a transaction on a dedicated pooled connection.
    pub fn begin(&self) -> Result<StoreTransaction, BackendError> {
        let conn = self.pool.get()?;
        conn.execute_batch("BEGIN")?;
        Ok(StoreTransaction {
            conn,
            catalog: Arc::clone(&self.catalog),
            active: true,
        })
    }
}

/// A live transaction owning one pooled connection.
///
/// Dropping an uncommitted transaction rolls it back.
pub struct StoreTransaction {
    conn: DbConnection,
    catalog: Arc<QueryCatalog>,
    active: bool,
}

impl StoreTransaction {
    pub fn execute(&self, name: &str, args: &Args) -> Result<usize, BackendError> {
        execute_on(&self.conn, &self.catalog, name, args)
    }

    pub fn query<T, F>(&self, name: &str, args: &Args, f: F) -> Result<Vec<T>, BackendError>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        query_on(&self.conn, &self.catalog, name, args, f)
    }

    /// Make every statement of the transaction durable.
    ///
    /// If the commit fails the transaction stays open and is rolled back
    /// when dropped.
    pub fn commit(mut self) -> Result<(), BackendError> {
        self.conn.execute_batch("COMMIT")?;
        self.active = false;
        Ok(())
    }

    /// Discard every statement of the transaction.
    pub fn rollback(mut self) -> Result<(), BackendError> {
        self.active = false;
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

impl Drop for StoreTransaction {
    fn drop(&mut self) {
        if self.active {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!("Rollback of abandoned transaction failed: {}", e);
            }
        }
    }
}
