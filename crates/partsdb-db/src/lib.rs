use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/partsdb-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &partsdb_core::AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error("job run {id} is not in '{expected_status}' status")]
    InvalidJobRunTransition {
        id: i64,
        expected_status: &'static str,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    /// Postgres SQLSTATE of the underlying database error, if any.
    #[must_use]
    pub fn sqlstate(&self) -> Option<String> {
        match self {
            DbError::Sqlx(sqlx::Error::Database(db_err)) => db_err.code().map(|c| c.into_owned()),
            _ => None,
        }
    }

    /// `true` for a unique-constraint violation (`23505`).
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        self.sqlstate().as_deref() == Some("23505")
    }

    /// `true` for a foreign-key violation (`23503`).
    #[must_use]
    pub fn is_foreign_key_violation(&self) -> bool {
        self.sqlstate().as_deref() == Some("23503")
    }
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Apply every migration the database has not seen yet.
///
/// Returns how many were pending before the run.
///
/// # Errors
///
/// Returns [`DbError::Migration`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, DbError> {
    // A fresh database has no _sqlx_migrations table yet.
    let applied: Vec<i64> =
        sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations WHERE success")
            .fetch_all(pool)
            .await
            .unwrap_or_default();

    let pending = MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration() && !applied.contains(&m.version))
        .count();

    MIGRATOR.run(pool).await?;
    tracing::debug!(pending, "migrations up to date");
    Ok(pending)
}

/// Verify the pool can serve a query.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if no connection can be acquired or the probe
/// query fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Clamp a 1-based page number and page size into `(limit, offset)`.
#[must_use]
pub fn page_bounds(page: Option<i64>, per_page: i64) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.clamp(1, 200);
    (per_page, (page - 1).saturating_mul(per_page))
}


pub mod brand_aliases;
pub mod catalog_items;
pub mod integrations;
pub mod job_runs;
pub mod seed;
pub mod status_entries;

pub use brand_aliases::{
    clear_brand_aliases, create_brand_alias, delete_brand_alias, get_brand_alias,
    list_brand_aliases, resolve_brand, update_brand_alias, BrandAliasRow,
};
pub use catalog_items::{
    apply_catalog_writes, delete_catalog_item, find_catalog_items_by_prefix, get_catalog_item,
    get_catalog_items, list_catalog_items, AppliedCatalogWrite, CatalogItemFilters,
    CatalogItemRow, CatalogWrite, ImageFields,
};
pub use integrations::{
    bulk_create_mappings, create_group, create_mapping, delete_group, delete_mapping, get_group,
    get_mapping, list_groups, list_mappings, update_group, update_mapping, IntegrationGroupRow,
    IntegrationMappingRow, MappingFields,
};
pub use job_runs::{
    create_job_run, fail_job_run, finish_job_run, get_job_run, list_job_runs, start_job_run,
    JobRunRow,
};
pub use seed::seed_brand_aliases;
pub use status_entries::{StatusEntryRow, StatusStore};
