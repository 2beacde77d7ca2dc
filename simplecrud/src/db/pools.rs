//! Connection pool construction.
//!
//! The driver parses the connection string; we only layer the application name and pool
//! sizing from [`DatabaseConfig`] on top of it.

use crate::config::DatabaseConfig;
use crate::db::errors::Result;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::str::FromStr;
use tracing::{info, instrument};

/// Build connect options from the configured URL
pub fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions> {
    let options = PgConnectOptions::from_str(&config.url)?.application_name(&config.application_name);
    Ok(options)
}

/// Open a pool and establish its first connection.
#[instrument(skip(config), fields(application_name = %config.application_name, max_connections = config.pool.max_connections), err)]
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let options = connect_options(config)?;
    info!(host = options.get_host(), port = options.get_port(), "Connecting to database");

    let pool = PgPoolOptions::new()
        .max_connections(config.pool.max_connections)
        .acquire_timeout(config.pool.acquire_timeout())
        .connect_with(options)
        .await?;

    Ok(pool)
}
