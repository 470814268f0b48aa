//! NX9 PowerDNS Backend Library
//!
//! This library turns the record-lookup and zone-update operations of an
//! authoritative DNS server into parameterized SQLite statements.
//! Statements are declared once in a catalog with named placeholders,
//! compiled to positional form, and executed either on a pooled connection
//! or inside a transaction registered under a caller-chosen id.

// Define modules
pub mod args;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod db;
pub mod errors;
pub mod query;
pub mod transaction;
pub mod types;
pub mod utils;
mod dnssec;
mod domains;
mod zone;

// Re-export commonly used items
pub use args::Args;
pub use backend::{Backend, OrderNameHasher};
pub use config::BackendConfig;
pub use errors::BackendError;
pub use types::{
    Autoprimary, Comment, DomainInfo, DomainKind, KeyData, OrderEntry, ResourceRecord, TsigKey,
};
