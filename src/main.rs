//! NX9 PowerDNS Backend
//!
//! Opens the record database, provisions its schema and keeps the backend
//! ready until a shutdown signal arrives.

use log::info;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;

use nx9_pdns_backend::{
    config::BackendConfig,
    db::{init_db, open_pool},
    Backend, BackendError,
};

#[tokio::main]
async fn main() -> Result<(), BackendError> {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    // Load configuration from environment variables
    let config = BackendConfig::from_env()?;

    if let Some(addr) = config.metrics_bind {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| BackendError::Metrics(e.to_string()))?;
        info!("Prometheus exporter listening on {}", addr);
    }

    // Initialize the database
    let pool = open_pool(&config)?;
    init_db(&pool)?;

    let backend = Backend::new(pool, config.dnssec)?;
    info!("Backend ready on {} ({:?})", config.db_path, backend);

    signal::ctrl_c().await?;
    info!("Shutdown signal received");
    Ok(())
}
