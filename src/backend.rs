//! The backend service.
//!
//! `Backend` ties together the statement catalog, the record store and the
//! transaction registry, and exposes one method per backend operation.
//! Record and transaction operations live here; zone updates, DNSSEC
//! material and domain administration are implemented in their own modules.

use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::args::Args;
use crate::catalog::QueryCatalog;
use crate::db::{DbPool, RecordStore, StoreTransaction};
use crate::errors::BackendError;
use crate::transaction::TransactionRegistry;
use crate::types::{ResourceRecord, ANY_TYPE};
use crate::utils::pattern_to_like;

/// Computes NSEC3 ordering keys.
///
/// The hash parameters are a property of the zone's DNSSEC configuration,
/// so the backend never computes them itself.
pub trait OrderNameHasher: Send + Sync {
    /// Hash `qname` within `zone` into an ordering key.
    fn hash(&self, zone: &str, qname: &str) -> String;
}

impl<F> OrderNameHasher for F
where
    F: Fn(&str, &str) -> String + Send + Sync,
{
    fn hash(&self, zone: &str, qname: &str) -> String {
        self(zone, qname)
    }
}

/// Relational backend for an authoritative DNS server.
pub struct Backend {
    pub(crate) store: RecordStore,
    pub(crate) registry: TransactionRegistry,
    pub(crate) dnssec: bool,
    pub(crate) hasher: Option<Arc<dyn OrderNameHasher>>,
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("dnssec", &self.dnssec)
            .field("open_transactions", &self.registry.len())
            .field("hasher", &self.hasher.is_some())
            .finish()
    }
}

impl Backend {
    /// Build a backend on top of `pool` with the built-in catalog.
    ///
    /// # Arguments
    /// * `pool` - Connection pool to an already provisioned database.
    /// * `dnssec` - Whether DNSSEC mode is enabled.
    ///
    /// # Returns
    /// The backend, or `BackendError::Parse` if the catalog fails to compile.
    pub fn new(pool: DbPool, dnssec: bool) -> Result<Self, BackendError> {
        Ok(Self::with_catalog(pool, Arc::new(QueryCatalog::new()?), dnssec))
    }

    /// Build a backend with a caller-supplied catalog.
    pub fn with_catalog(pool: DbPool, catalog: Arc<QueryCatalog>, dnssec: bool) -> Self {
        Self {
            store: RecordStore::new(pool, catalog),
            registry: TransactionRegistry::new(),
            dnssec,
            hasher: None,
        }
    }

    /// Inject the NSEC3 ordering key hasher.
    pub fn with_hasher(mut self, hasher: impl OrderNameHasher + 'static) -> Self {
        self.hasher = Some(Arc::new(hasher));
        self
    }

    pub fn dnssec(&self) -> bool {
        self.dnssec
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub(crate) fn require_dnssec(&self) -> Result<(), BackendError> {
        if self.dnssec {
            Ok(())
        } else {
            Err(BackendError::DnssecRequired)
        }
    }

    /// Run `f` inside the transaction registered under `id`.
    pub(crate) fn in_transaction<T, F>(&self, id: i64, f: F) -> Result<T, BackendError>
    where
        F: FnOnce(&StoreTransaction) -> Result<T, BackendError>,
    {
        self.registry.with(id, f)
    }

    /// Run `f` in a short-lived transaction that is not registered under
    /// any id, committing on success.
    pub(crate) fn atomically<T, F>(&self, f: F) -> Result<T, BackendError>
    where
        F: FnOnce(&StoreTransaction) -> Result<T, BackendError>,
    {
        let tx = self.store.begin()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Look up enabled records by name and type.
    ///
    /// # Arguments
    /// * `qtype` - Record type, or `ANY` for every type.
    /// * `qname` - Owner name.
    /// * `zone_id` - Restrict the lookup to one zone.
    pub fn lookup(
        &self,
        qtype: &str,
        qname: &str,
        zone_id: Option<i64>,
    ) -> Result<Vec<ResourceRecord>, BackendError> {
        let any = qtype.eq_ignore_ascii_case(ANY_TYPE);
        let statement = match (any, zone_id) {
            (false, None) => "basic-query",
            (false, Some(_)) => "id-query",
            (true, None) => "any-query",
            (true, Some(_)) => "any-id-query",
        };
        let mut args = Args::new().with_text("qname", qname);
        if !any {
            args = args.with_text("qtype", qtype);
        }
        if let Some(id) = zone_id {
            args = args.with("domain_id", id);
        }
        self.store.query(statement, &args, ResourceRecord::from_row)
    }

    /// List every record of a zone, ordered by name and type.
    ///
    /// When `domain_id` is absent the zone is resolved by name.
    pub fn list(
        &self,
        zonename: &str,
        domain_id: Option<i64>,
        include_disabled: bool,
    ) -> Result<Vec<ResourceRecord>, BackendError> {
        let domain_id = match domain_id {
            Some(id) => id,
            None => self
                .get_domain_id(zonename)?
                .ok_or_else(|| BackendError::DomainNotFound(zonename.to_owned()))?,
        };
        let args = Args::new()
            .with("include_disabled", include_disabled)
            .with("domain_id", domain_id);
        self.store.query("list-query", &args, ResourceRecord::from_list_row)
    }

    /// List the enabled records at and below `zone` within a zone.
    pub fn list_subzone(&self, zone: &str, domain_id: i64) -> Result<Vec<ResourceRecord>, BackendError> {
        let args = Args::new()
            .with_text("zone", zone)
            .with("wildzone", format!("%.{}", zone))
            .with("domain_id", domain_id);
        self.store.query("list-subzone-query", &args, ResourceRecord::from_row)
    }

    /// Search records whose name or content matches a `*`/`?` pattern.
    pub fn search_records(
        &self,
        pattern: &str,
        max_results: u32,
    ) -> Result<Vec<ResourceRecord>, BackendError> {
        let like = pattern_to_like(pattern);
        let args = Args::new()
            .with("value", like.clone())
            .with("value2", like)
            .with("limit", max_results);
        self.store.query("search-records-query", &args, ResourceRecord::from_row)
    }

    /// Open transaction `id`.
    ///
    /// With a positive `zone_id` every record of that zone is deleted as the
    /// transaction's first statement, so the caller can feed the zone anew.
    ///
    /// # Returns
    /// `BackendError::TransactionConflict` if `id` is already open.
    pub fn start_transaction(&self, id: i64, zone_id: i64) -> Result<(), BackendError> {
        self.registry.start(id, || {
            let tx = self.store.begin()?;
            if zone_id > 0 {
                let deleted = tx.execute("delete-zone-query", &Args::new().with("domain_id", zone_id))?;
                debug!("Transaction {} cleared {} records of zone {}", id, deleted, zone_id);
            }
            Ok(tx)
        })
    }

    /// Commit transaction `id`. The id is free again afterwards.
    pub fn commit_transaction(&self, id: i64) -> Result<(), BackendError> {
        self.registry.commit(id)
    }

    /// Abort transaction `id`. The id is free again afterwards.
    pub fn abort_transaction(&self, id: i64) -> Result<(), BackendError> {
        self.registry.abort(id)
    }

    /// Whether transaction `id` is open.
    pub fn in_progress(&self, id: i64) -> bool {
        self.registry.contains(id)
    }
}
