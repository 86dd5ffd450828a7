//! Database operations for the `catalog_items` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{page_bounds, DbError};

/// Default page size for catalog listings.
pub const DEFAULT_PER_PAGE: i64 = 40;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `catalog_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CatalogItemRow {
    pub id: i64,
    pub brand: String,
    pub article: String,
    /// Path relative to the storage root, e.g. `"bosch/ab1234.png"`.
    pub image_path: Option<String>,
    pub content_sha256: Option<String>,
    pub byte_size: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Image fields written alongside a catalog record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFields {
    pub image_path: String,
    pub content_sha256: String,
    pub byte_size: i64,
}

/// One upsert keyed by `(brand, article)`.
///
/// `image: None` creates or touches the record and leaves existing image
/// fields as they are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogWrite {
    pub brand: String,
    pub article: String,
    pub image: Option<ImageFields>,
}

/// Result of applying one [`CatalogWrite`].
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AppliedCatalogWrite {
    pub id: i64,
    pub created: bool,
    /// `image_path` the record held before this write.
    pub previous_image_path: Option<String>,
}

/// Filters for [`list_catalog_items`].
#[derive(Debug, Clone, Default)]
pub struct CatalogItemFilters {
    /// Case-insensitive substring of the brand.
    pub brand: Option<String>,
    /// Case-insensitive substring of the article.
    pub article: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Returns one page of catalog items plus the total number of matches.
///
/// Items are ordered newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_catalog_items(
    pool: &PgPool,
    filters: &CatalogItemFilters,
) -> Result<(Vec<CatalogItemRow>, i64), DbError> {
    let brand = non_blank(filters.brand.as_deref());
    let article = non_blank(filters.article.as_deref());
    let (limit, offset) = page_bounds(
        filters.page,
        filters.per_page.unwrap_or(DEFAULT_PER_PAGE),
    );

    let rows = sqlx::query_as::<_, CatalogItemRow>(
        "SELECT id, brand, article, image_path, content_sha256, byte_size, created_at, updated_at \
         FROM catalog_items \
         WHERE ($1::text IS NULL OR POSITION(LOWER($1) IN brand) > 0) \
           AND ($2::text IS NULL OR POSITION(LOWER($2) IN article) > 0) \
         ORDER BY updated_at DESC, id DESC \
         LIMIT $3 OFFSET $4",
    )
    .bind(brand)
    .bind(article)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM catalog_items \
         WHERE ($1::text IS NULL OR POSITION(LOWER($1) IN brand) > 0) \
           AND ($2::text IS NULL OR POSITION(LOWER($2) IN article) > 0)",
    )
    .bind(brand)
    .bind(article)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

/// Returns a single catalog item by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_catalog_item(pool: &PgPool, id: i64) -> Result<Option<CatalogItemRow>, DbError> {
    let row = sqlx::query_as::<_, CatalogItemRow>(
        "SELECT id, brand, article, image_path, content_sha256, byte_size, created_at, updated_at \
         FROM catalog_items \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns the catalog items with the given ids, in ascending id order.
/// Unknown ids are silently absent from the result.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_catalog_items(pool: &PgPool, ids: &[i64]) -> Result<Vec<CatalogItemRow>, DbError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, CatalogItemRow>(
        "SELECT id, brand, article, image_path, content_sha256, byte_size, created_at, updated_at \
         FROM catalog_items \
         WHERE id = ANY($1) \
         ORDER BY id",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns items of `brand` whose article starts with `article_prefix`,
/// ordered by article.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_catalog_items_by_prefix(
    pool: &PgPool,
    brand: &str,
    article_prefix: &str,
) -> Result<Vec<CatalogItemRow>, DbError> {
    let pattern = format!("{}%", escape_like(article_prefix));

    let rows = sqlx::query_as::<_, CatalogItemRow>(
        "SELECT id, brand, article, image_path, content_sha256, byte_size, created_at, updated_at \
         FROM catalog_items \
         WHERE brand = $1 AND article LIKE $2 ESCAPE '\\' \
         ORDER BY article, id",
    )
    .bind(brand)
    .bind(pattern)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Applies every write inside one transaction and returns one
/// [`AppliedCatalogWrite`] per input, in input order.
///
/// Any failure rolls the whole transaction back; nothing is persisted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement or the commit fails.
pub async fn apply_catalog_writes(
    pool: &PgPool,
    writes: &[CatalogWrite],
) -> Result<Vec<AppliedCatalogWrite>, DbError> {
    let mut tx = pool.begin().await?;
    let mut applied = Vec::with_capacity(writes.len());

    for write in writes {
        let image = write.image.as_ref();
        // The CTE reads the pre-statement snapshot, so `prev` holds the path
        // the row had before this upsert.
        let row = sqlx::query_as::<_, AppliedCatalogWrite>(
            "WITH prev AS ( \
                 SELECT image_path FROM catalog_items WHERE brand = $1 AND article = $2 \
             ) \
             INSERT INTO catalog_items (brand, article, image_path, content_sha256, byte_size) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT ON CONSTRAINT catalog_items_brand_article_key DO UPDATE SET \
                 image_path = COALESCE(EXCLUDED.image_path, catalog_items.image_path), \
                 content_sha256 = COALESCE(EXCLUDED.content_sha256, catalog_items.content_sha256), \
                 byte_size = COALESCE(EXCLUDED.byte_size, catalog_items.byte_size), \
                 updated_at = NOW() \
             RETURNING id, (xmax = 0) AS created, (SELECT image_path FROM prev) AS previous_image_path",
        )
        .bind(&write.brand)
        .bind(&write.article)
        .bind(image.map(|i| i.image_path.as_str()))
        .bind(image.map(|i| i.content_sha256.as_str()))
        .bind(image.map(|i| i.byte_size))
        .fetch_one(&mut *tx)
        .await?;

        applied.push(row);
    }

    tx.commit().await?;
    Ok(applied)
}

/// Deletes a catalog item by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has `id`, or [`DbError::Sqlx`] on
/// failure.
pub async fn delete_catalog_item(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM catalog_items WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Escape `LIKE` metacharacters so the input matches literally.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
