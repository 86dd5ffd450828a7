//! Database operations for `integration_groups` and `integration_mappings`.
//!
//! A group is a named set of brand/article replacement rules used when
//! importing supplier feeds. Deleting a group cascades to its mappings.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{page_bounds, DbError};

/// Default page size for mapping listings.
pub const MAPPINGS_PER_PAGE: i64 = 30;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from `integration_groups`, with its mapping count.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IntegrationGroupRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub mapping_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row from `integration_mappings`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IntegrationMappingRow {
    pub id: i64,
    pub group_id: i64,
    pub brand: String,
    pub article: String,
    pub description: Option<String>,
    pub brand_replace: String,
    pub article_replace: String,
    pub description_replace: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Writable mapping columns.
#[derive(Debug, Clone, Copy)]
pub struct MappingFields<'a> {
    pub brand: &'a str,
    pub article: &'a str,
    pub description: Option<&'a str>,
    pub brand_replace: &'a str,
    pub article_replace: &'a str,
    pub description_replace: Option<&'a str>,
}

const GROUP_COLUMNS: &str = "g.id, g.name, g.description, \
     (SELECT COUNT(*) FROM integration_mappings m WHERE m.group_id = g.id) AS mapping_count, \
     g.created_at, g.updated_at";

const MAPPING_COLUMNS: &str = "id, group_id, brand, article, description, brand_replace, \
     article_replace, description_replace, created_at, updated_at";

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// Lists every group ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_groups(pool: &PgPool) -> Result<Vec<IntegrationGroupRow>, DbError> {
    let rows = sqlx::query_as::<_, IntegrationGroupRow>(&format!(
        "SELECT {GROUP_COLUMNS} FROM integration_groups g ORDER BY g.name, g.id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a group by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_group(pool: &PgPool, id: i64) -> Result<Option<IntegrationGroupRow>, DbError> {
    let row = sqlx::query_as::<_, IntegrationGroupRow>(&format!(
        "SELECT {GROUP_COLUMNS} FROM integration_groups g WHERE g.id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Creates a group and returns its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_group(
    pool: &PgPool,
    name: &str,
    description: Option<&str>,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO integration_groups (name, description) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(description)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Replaces a group's name and description.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no group has `id`, or [`DbError::Sqlx`]
/// on failure.
pub async fn update_group(
    pool: &PgPool,
    id: i64,
    name: &str,
    description: Option<&str>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE integration_groups \
         SET name = $2, description = $3, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Deletes a group and, by cascade, all of its mappings.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no group has `id`, or [`DbError::Sqlx`]
/// on failure.
pub async fn delete_group(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM integration_groups WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Mappings
// ---------------------------------------------------------------------------

/// Returns one page of a group's mappings (oldest first) and the group's
/// total mapping count.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_mappings(
    pool: &PgPool,
    group_id: i64,
    page: Option<i64>,
    per_page: Option<i64>,
) -> Result<(Vec<IntegrationMappingRow>, i64), DbError> {
    let (limit, offset) = page_bounds(page, per_page.unwrap_or(MAPPINGS_PER_PAGE));

    let rows = sqlx::query_as::<_, IntegrationMappingRow>(&format!(
        "SELECT {MAPPING_COLUMNS} FROM integration_mappings \
         WHERE group_id = $1 \
         ORDER BY id \
         LIMIT $2 OFFSET $3"
    ))
    .bind(group_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM integration_mappings WHERE group_id = $1",
    )
    .bind(group_id)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

/// Returns a mapping by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_mapping(
    pool: &PgPool,
    id: i64,
) -> Result<Option<IntegrationMappingRow>, DbError> {
    let row = sqlx::query_as::<_, IntegrationMappingRow>(&format!(
        "SELECT {MAPPING_COLUMNS} FROM integration_mappings WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts one mapping into `group_id` and returns the full row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on failure; an unknown group surfaces as a
/// foreign-key violation (see [`DbError::is_foreign_key_violation`]).
pub async fn create_mapping(
    pool: &PgPool,
    group_id: i64,
    fields: MappingFields<'_>,
) -> Result<IntegrationMappingRow, DbError> {
    let row = sqlx::query_as::<_, IntegrationMappingRow>(&format!(
        "INSERT INTO integration_mappings \
             (group_id, brand, article, description, brand_replace, article_replace, description_replace) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {MAPPING_COLUMNS}"
    ))
    .bind(group_id)
    .bind(fields.brand)
    .bind(fields.article)
    .bind(fields.description)
    .bind(fields.brand_replace)
    .bind(fields.article_replace)
    .bind(fields.description_replace)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Inserts every mapping into `group_id` in one transaction.
///
/// Returns the number of rows inserted. Nothing is inserted if any row fails.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert or the commit fails.
pub async fn bulk_create_mappings(
    pool: &PgPool,
    group_id: i64,
    mappings: &[MappingFields<'_>],
) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;

    for fields in mappings {
        sqlx::query(
            "INSERT INTO integration_mappings \
                 (group_id, brand, article, description, brand_replace, article_replace, description_replace) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(group_id)
        .bind(fields.brand)
        .bind(fields.article)
        .bind(fields.description)
        .bind(fields.brand_replace)
        .bind(fields.article_replace)
        .bind(fields.description_replace)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::info!(group_id, count = mappings.len(), "mappings bulk-created");
    Ok(mappings.len())
}

/// Replaces every writable column of a mapping.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no mapping has `id`, or [`DbError::Sqlx`]
/// on failure.
pub async fn update_mapping(
    pool: &PgPool,
    id: i64,
    fields: MappingFields<'_>,
) -> Result<IntegrationMappingRow, DbError> {
    let row = sqlx::query_as::<_, IntegrationMappingRow>(&format!(
        "UPDATE integration_mappings \
         SET brand = $2, article = $3, description = $4, brand_replace = $5, \
             article_replace = $6, description_replace = $7, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {MAPPING_COLUMNS}"
    ))
    .bind(id)
    .bind(fields.brand)
    .bind(fields.article)
    .bind(fields.description)
    .bind(fields.brand_replace)
    .bind(fields.article_replace)
    .bind(fields.description_replace)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Deletes a mapping.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no mapping has `id`, or [`DbError::Sqlx`]
/// on failure.
pub async fn delete_mapping(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM integration_mappings WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
