use partsdb_core::BrandAliasConfig;
use sqlx::PgPool;

use crate::DbError;

/// Upsert every configured brand and its aliases in one transaction.
///
/// Rows are matched case-insensitively on the canonical name; an existing
/// row takes the configured spelling and alias list. Brands present in the
/// database but absent from `brands` are left alone.
///
/// Returns the number of brands written.
///
/// # Errors
///
/// Returns `DbError` on database query failure.
pub async fn seed_brand_aliases(
    pool: &PgPool,
    brands: &[BrandAliasConfig],
) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;

    for brand in brands {
        sqlx::query(
            "INSERT INTO brand_aliases (canonical_brand, alias_blob) \
             VALUES ($1, $2) \
             ON CONFLICT (LOWER(canonical_brand)) DO UPDATE SET \
                 canonical_brand = EXCLUDED.canonical_brand, \
                 alias_blob = EXCLUDED.alias_blob, \
                 updated_at = NOW()",
        )
        .bind(brand.canonical.trim())
        .bind(brand.alias_blob())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::info!(count = brands.len(), "brand aliases seeded");
    Ok(brands.len())
}
