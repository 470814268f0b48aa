//! Registry of open transactions keyed by caller-chosen ids.
//!
//! The id map is guarded by one mutex. Each entry is itself a mutex around
//! the transaction, so statements for one id run in the order callers issue
//! them while other ids proceed independently. Starting an id reserves its
//! slot before the transaction is opened, which makes two concurrent starts
//! for the same id resolve to exactly one winner.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};
use metrics::{gauge, increment_counter};

use crate::db::StoreTransaction;
use crate::errors::BackendError;

type Slot = Arc<Mutex<Option<StoreTransaction>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn outcome_counter<T>(
    result: &Result<T, BackendError>,
    ok: &'static str,
    failed: &'static str,
) -> &'static str {
    if result.is_ok() {
        ok
    } else {
        failed
    }
}

/// Open transactions by id.
#[derive(Default)]
pub struct TransactionRegistry {
    open: Mutex<HashMap<i64, Slot>>,
}

impl TransactionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently registered ids.
    pub fn len(&self) -> usize {
        lock(&self.open).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `id` is currently registered.
    pub fn contains(&self, id: i64) -> bool {
        lock(&self.open).contains_key(&id)
    }

    /// Register a new transaction under `id`.
    ///
    /// `open` is called with the id already reserved; it must return the
    /// live transaction with any initial statements applied. If it fails the
    /// reservation is released and nothing is registered.
    ///
    /// # Returns
    /// `BackendError::TransactionConflict` if `id` is already open.
    pub fn start<F>(&self, id: i64, open: F) -> Result<(), BackendError>
    where
        F: FnOnce() -> Result<StoreTransaction, BackendError>,
    {
        let slot: Slot = Arc::new(Mutex::new(None));
        let mut guard = lock(&slot);
        {
            let mut map = lock(&self.open);
            match map.entry(id) {
                Entry::Occupied(_) => {
                    warn!("Transaction {} is already open", id);
                    increment_counter!("pdns_backend_transaction_conflicts_total");
                    return Err(BackendError::TransactionConflict(id));
                }
                Entry::Vacant(entry) => {
                    entry.insert(Arc::clone(&slot));
                }
            }
        }

        match open() {
            Ok(tx) => {
                *guard = Some(tx);
                drop(guard);
                debug!("Started transaction {}", id);
                increment_counter!("pdns_backend_transactions_started_total");
                gauge!("pdns_backend_transactions_open", self.len() as f64);
                Ok(())
            }
            Err(e) => {
                drop(guard);
                self.release(id, &slot);
                Err(e)
            }
        }
    }

    /// Run `f` against the transaction registered under `id`.
    ///
    /// # Returns
    /// `BackendError::NoActiveTransaction` if `id` is not open, otherwise
    /// whatever `f` returns.
    pub fn with<T, F>(&self, id: i64, f: F) -> Result<T, BackendError>
    where
        F: FnOnce(&StoreTransaction) -> Result<T, BackendError>,
    {
        let slot = lock(&self.open)
            .get(&id)
            .cloned()
            .ok_or(BackendError::NoActiveTransaction(id))?;
        let guard = lock(&slot);
        match guard.as_ref() {
            Some(tx) => f(tx),
            // terminated between lookup and use
            None => Err(BackendError::NoActiveTransaction(id)),
        }
    }

    /// Commit the transaction registered under `id`.
    ///
    /// The id is released even if the commit itself fails.
    pub fn commit(&self, id: i64) -> Result<(), BackendError> {
        let tx = self.take(id)?;
        let result = tx.commit();
        match &result {
            Ok(()) => debug!("Committed transaction {}", id),
            Err(e) => warn!("Commit of transaction {} failed: {}", id, e),
        }
        increment_counter!(outcome_counter(
            &result,
            "pdns_backend_transactions_committed_total",
            "pdns_backend_transaction_commit_failures_total",
        ));
        result
    }

    /// Roll back the transaction registered under `id`.
    ///
    /// The id is released even if the rollback itself fails.
    pub fn abort(&self, id: i64) -> Result<(), BackendError> {
        let tx = self.take(id)?;
        let result = tx.rollback();
        match &result {
            Ok(()) => debug!("Aborted transaction {}", id),
            Err(e) => warn!("Rollback of transaction {} failed: {}", id, e),
        }
        increment_counter!(outcome_counter(
            &result,
            "pdns_backend_transactions_aborted_total",
            "pdns_backend_transaction_abort_failures_total",
        ));
        result
    }

    fn take(&self, id: i64) -> Result<StoreTransaction, BackendError> {
        let slot = lock(&self.open)
            .remove(&id)
            .ok_or(BackendError::NoSuchTransaction(id))?;
        gauge!("pdns_backend_transactions_open", self.len() as f64);
        // waits for any statement still running on this id
        let tx = lock(&slot).take();
        tx.ok_or(BackendError::NoSuchTransaction(id))
    }

    fn release(&self, id: i64, slot: &Slot) {
        let mut map = lock(&self.open);
        if map.get(&id).map_or(false, |current| Arc::ptr_eq(current, slot)) {
            map.remove(&id);
        }
    }
}
