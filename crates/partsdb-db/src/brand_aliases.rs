//! Database operations for the `brand_aliases` table.

use chrono::{DateTime, Utc};
use partsdb_core::{resolve, BrandMatch};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `brand_aliases` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BrandAliasRow {
    pub id: i64,
    pub canonical_brand: String,
    /// Aliases joined with `" | "`.
    pub alias_blob: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BrandAliasRow {
    #[must_use]
    pub fn aliases(&self) -> Vec<String> {
        partsdb_core::parse_alias_blob(&self.alias_blob)
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Lists brand aliases ordered by canonical name.
///
/// When `q` is given, only rows whose canonical name or alias blob contains it
/// (case-insensitive) are returned.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_brand_aliases(
    pool: &PgPool,
    q: Option<&str>,
) -> Result<Vec<BrandAliasRow>, DbError> {
    let q = q.map(str::trim).filter(|s| !s.is_empty());

    let rows = sqlx::query_as::<_, BrandAliasRow>(
        "SELECT id, canonical_brand, alias_blob, created_at, updated_at \
         FROM brand_aliases \
         WHERE $1::text IS NULL \
            OR POSITION(LOWER($1) IN LOWER(canonical_brand)) > 0 \
            OR POSITION(LOWER($1) IN LOWER(alias_blob)) > 0 \
         ORDER BY LOWER(canonical_brand)",
    )
    .bind(q)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single brand alias row by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_brand_alias(pool: &PgPool, id: i64) -> Result<Option<BrandAliasRow>, DbError> {
    let row = sqlx::query_as::<_, BrandAliasRow>(
        "SELECT id, canonical_brand, alias_blob, created_at, updated_at \
         FROM brand_aliases \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts a brand with its alias list and returns the new row.
///
/// `aliases` is cleaned (trimmed, blanks dropped, case-insensitive duplicates
/// collapsed) before it is stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on failure; a duplicate canonical name surfaces
/// as a unique violation (see [`DbError::is_unique_violation`]).
pub async fn create_brand_alias(
    pool: &PgPool,
    canonical_brand: &str,
    aliases: &[String],
) -> Result<BrandAliasRow, DbError> {
    let blob = partsdb_core::render_alias_blob(aliases);

    let row = sqlx::query_as::<_, BrandAliasRow>(
        "INSERT INTO brand_aliases (canonical_brand, alias_blob) \
         VALUES ($1, $2) \
         RETURNING id, canonical_brand, alias_blob, created_at, updated_at",
    )
    .bind(canonical_brand.trim())
    .bind(blob)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Updates the canonical name and/or the alias list of a brand.
///
/// `None` leaves a field unchanged.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has `id`, or [`DbError::Sqlx`] on
/// failure.
pub async fn update_brand_alias(
    pool: &PgPool,
    id: i64,
    canonical_brand: Option<&str>,
    aliases: Option<&[String]>,
) -> Result<BrandAliasRow, DbError> {
    let blob = aliases.map(partsdb_core::render_alias_blob::<String>);

    let row = sqlx::query_as::<_, BrandAliasRow>(
        "UPDATE brand_aliases \
         SET canonical_brand = COALESCE($2, canonical_brand), \
             alias_blob = COALESCE($3, alias_blob), \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id, canonical_brand, alias_blob, created_at, updated_at",
    )
    .bind(id)
    .bind(canonical_brand.map(str::trim))
    .bind(blob)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Empties the alias list of one brand, keeping the canonical name.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has `id`, or [`DbError::Sqlx`] on
/// failure.
pub async fn clear_brand_aliases(pool: &PgPool, id: i64) -> Result<BrandAliasRow, DbError> {
    let row = sqlx::query_as::<_, BrandAliasRow>(
        "UPDATE brand_aliases \
         SET alias_blob = '', updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id, canonical_brand, alias_blob, created_at, updated_at",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Deletes a brand alias row.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has `id`, or [`DbError::Sqlx`] on
/// failure.
pub async fn delete_brand_alias(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM brand_aliases WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolves a free-text brand string to canonical brands, strongest first.
///
/// Postgres narrows the candidates to rows whose canonical name equals the
/// query or whose alias blob contains it; [`partsdb_core::resolve`] then
/// classifies and ranks them. A blank query yields an empty list.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn resolve_brand(pool: &PgPool, query: &str) -> Result<Vec<BrandMatch>, DbError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let candidates = sqlx::query_as::<_, (String, String)>(
        "SELECT canonical_brand, alias_blob \
         FROM brand_aliases \
         WHERE LOWER(canonical_brand) = LOWER($1) \
            OR POSITION(LOWER($1) IN LOWER(alias_blob)) > 0",
    )
    .bind(query)
    .fetch_all(pool)
    .await?;

    let matches = resolve(
        candidates
            .iter()
            .map(|(canonical, blob)| (canonical.as_str(), blob.as_str())),
        query,
    );

    tracing::debug!(query, hits = matches.len(), "brand resolved");
    Ok(matches)
}
