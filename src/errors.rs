//! Error types for the backend.
//!
//! This module defines the error type returned by every backend operation.

use thiserror::Error;

/// Represents errors that can occur in the backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// I/O errors from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database errors from rusqlite.
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    /// Errors checking a connection out of the pool.
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// A statement template contains a malformed placeholder.
    #[error("Malformed placeholder at byte {position}: {reason}")]
    Parse {
        /// Byte offset of the offending `:` in the template.
        position: usize,
        /// What was wrong with the token.
        reason: String,
    },

    /// A flat argument list had an odd number of entries.
    #[error("Argument list must hold name/value pairs, got {0} entries")]
    ArgumentShape(usize),

    /// The symbolic statement name is not in the catalog.
    #[error("Unknown statement: {0}")]
    UnknownStatement(String),

    /// A transaction with this id is already open.
    #[error("Transaction {0} is already open")]
    TransactionConflict(i64),

    /// Commit or abort of an id that is not open.
    #[error("No such transaction: {0}")]
    NoSuchTransaction(i64),

    /// A transaction-scoped mutation was issued for an id that is not open.
    #[error("No active transaction: {0}")]
    NoActiveTransaction(i64),

    /// The operation is only available with DNSSEC enabled.
    #[error("Operation requires DNSSEC to be enabled")]
    DnssecRequired,

    /// An NSEC3 ordering key was needed but no hasher was injected.
    #[error("No ordering key hasher configured")]
    HasherMissing,

    /// The named domain does not exist.
    #[error("Domain not found: {0}")]
    DomainNotFound(String),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Integer parsing errors, e.g. SOA serials.
    #[error("Parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// Metrics exporter could not be installed.
    #[error("Metrics error: {0}")]
    Metrics(String),
}
