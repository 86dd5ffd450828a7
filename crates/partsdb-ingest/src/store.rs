//! Record-store seam between the catalog service and Postgres.

use async_trait::async_trait;
use partsdb_core::BrandMatch;
use partsdb_db::{AppliedCatalogWrite, CatalogItemRow, CatalogWrite, DbError};
use sqlx::PgPool;

/// Catalog record operations the service depends on.
///
/// `apply_writes` must be atomic: either every write is committed or none is.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn apply_writes(
        &self,
        writes: &[CatalogWrite],
    ) -> Result<Vec<AppliedCatalogWrite>, DbError>;

    async fn items_by_id(&self, ids: &[i64]) -> Result<Vec<CatalogItemRow>, DbError>;

    async fn delete_item(&self, id: i64) -> Result<(), DbError>;

    async fn resolve_brand(&self, query: &str) -> Result<Vec<BrandMatch>, DbError>;

    async fn find_by_prefix(
        &self,
        brand: &str,
        article_prefix: &str,
    ) -> Result<Vec<CatalogItemRow>, DbError>;
}

/// [`CatalogStore`] over a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn apply_writes(
        &self,
        writes: &[CatalogWrite],
    ) -> Result<Vec<AppliedCatalogWrite>, DbError> {
        partsdb_db::apply_catalog_writes(&self.pool, writes).await
    }

    async fn items_by_id(&self, ids: &[i64]) -> Result<Vec<CatalogItemRow>, DbError> {
        partsdb_db::get_catalog_items(&self.pool, ids).await
    }

    async fn delete_item(&self, id: i64) -> Result<(), DbError> {
        partsdb_db::delete_catalog_item(&self.pool, id).await
    }

    async fn resolve_brand(&self, query: &str) -> Result<Vec<BrandMatch>, DbError> {
        partsdb_db::resolve_brand(&self.pool, query).await
    }

    async fn find_by_prefix(
        &self,
        brand: &str,
        article_prefix: &str,
    ) -> Result<Vec<CatalogItemRow>, DbError> {
        partsdb_db::find_catalog_items_by_prefix(&self.pool, brand, article_prefix).await
    }
}
