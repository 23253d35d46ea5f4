//! Connecting to the bookings database and bringing its schema up to date.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::{debug, info};

use crate::config::DbConfig;

/// The `bookings` schema, embedded at compile time from `migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of [`ensure_database_exists`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    Created,
    AlreadyPresent,
}

/// Whether `name` can be spliced into `CREATE DATABASE` unquoted.
pub fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn options(max_connections: u32) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
}

/// Open a pool on the bookings database.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    options(MAX_CONNECTIONS)
        .connect(&config.database_url)
        .await
        .with_context(|| format!("failed to connect to bookings database at {}", config.database_url))
}

/// Apply any pending `bookings` migrations. Returns how many migrations the
/// schema is made of.
pub async fn run_migrations(pool: &PgPool) -> Result<usize> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to migrate bookings schema")?;

    let known = MIGRATOR.iter().count();
    debug!(migrations = known, "bookings schema up to date");
    Ok(known)
}

/// Open a pool and migrate it in one step, as `serve` and `db-init` need.
pub async fn connect_migrated(config: &DbConfig) -> Result<PgPool> {
    let pool = create_pool(config).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Create the bookings database on its server when it is missing.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<Provisioned> {
    let Some(db_name) = config.database_name() else {
        bail!("no database name in {}", config.database_url);
    };
    if !is_plain_identifier(db_name) {
        bail!("database name {db_name:?} must be letters, digits and underscores");
    }

    let server_url = config.maintenance_url();
    let server = options(1)
        .connect(&server_url)
        .await
        .with_context(|| format!("failed to connect to {server_url}"))?;

    let present: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(&server)
            .await
            .context("failed to look up bookings database")?;

    let outcome = if present {
        Provisioned::AlreadyPresent
    } else {
        server
            .execute(format!("CREATE DATABASE {db_name}").as_str())
            .await
            .with_context(|| format!("failed to create database {db_name}"))?;
        info!(db = db_name, "bookings database created");
        Provisioned::Created
    };

    server.close().await;
    Ok(outcome)
}
