// src/db/mod.rs

use std::time::Duration;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::config::AppConfig;

pub async fn connect(config: &AppConfig) -> anyhow::Result<Pool<Postgres>> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(8))
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    tracing::info!(max_connections = config.db_max_connections, "connected to PostgreSQL");
    Ok(pool)
}

/// Pool that only dials the database on first use.
#[cfg(test)]
pub fn connect_lazy(database_url: &str) -> anyhow::Result<Pool<Postgres>> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(8))
        .connect_lazy(database_url)
        .with_context(|| format!("failed to create lazy pool for {database_url}"))
}
