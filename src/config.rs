//! Configuration for the backend.
//!
//! This module defines the configuration structure and methods to load
//! configuration from environment variables.

use std::{env, net::SocketAddr};

use crate::errors::BackendError;

/// Default size of the connection pool.
pub const DEFAULT_POOL_SIZE: u32 = 8;

/// Default path of the SQLite database file.
pub const DEFAULT_DB_PATH: &str = "pdns.db";

/// Backend configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Path to the SQLite database file.
    pub db_path: String,

    /// Whether DNSSEC mode is enabled.
    pub dnssec: bool,

    /// Maximum number of pooled connections.
    pub pool_size: u32,

    /// Address for the Prometheus exporter, if any.
    pub metrics_bind: Option<SocketAddr>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.into(),
            dnssec: false,
            pool_size: DEFAULT_POOL_SIZE,
            metrics_bind: None,
        }
    }
}

impl BackendConfig {
    /// Load backend configuration from environment variables.
    ///
    /// # Returns
    /// A `Result` containing either the loaded `BackendConfig` or a `BackendError`.
    pub fn from_env() -> Result<Self, BackendError> {
        let pool_size = match env::var("DNS_POOL_SIZE") {
            Ok(v) => v
                .trim()
                .parse::<u32>()
                .map_err(|_| BackendError::Config(format!("Invalid DNS_POOL_SIZE: {v}")))?,
            Err(_) => DEFAULT_POOL_SIZE,
        };
        if pool_size == 0 {
            return Err(BackendError::Config("DNS_POOL_SIZE must be at least 1".into()));
        }

        let metrics_bind = match env::var("DNS_METRICS_BIND") {
            Ok(v) if !v.trim().is_empty() => Some(
                v.trim()
                    .parse()
                    .map_err(|_| BackendError::Config("Invalid DNS_METRICS_BIND address".into()))?,
            ),
            _ => None,
        };

        Ok(Self {
            db_path: env::var("DNS_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.into()),
            dnssec: env::var("DNS_DNSSEC")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            pool_size,
            metrics_bind,
        })
    }
}

fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true")
}
