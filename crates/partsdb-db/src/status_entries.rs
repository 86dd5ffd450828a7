//! Key-value status store backed by the `status_entries` table.
//!
//! External update workers report progress here (`xml_update_status`,
//! `parser_update_time`, ...); the dashboard reads it back.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `status_entries` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StatusEntryRow {
    pub name: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Typed handle over `status_entries`, cheap to clone.
#[derive(Debug, Clone)]
pub struct StatusStore {
    pool: PgPool,
}

impl StatusStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the entry called `name`, or `None` if it was never set.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the query fails.
    pub async fn get(&self, name: &str) -> Result<Option<StatusEntryRow>, DbError> {
        let row = sqlx::query_as::<_, StatusEntryRow>(
            "SELECT name, value, updated_at FROM status_entries WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Upserts `name = value` and stamps `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the upsert fails.
    pub async fn set(&self, name: &str, value: &str) -> Result<StatusEntryRow, DbError> {
        let row = sqlx::query_as::<_, StatusEntryRow>(
            "INSERT INTO status_entries (name, value) \
             VALUES ($1, $2) \
             ON CONFLICT (name) DO UPDATE SET \
                 value = EXCLUDED.value, \
                 updated_at = NOW() \
             RETURNING name, value, updated_at",
        )
        .bind(name)
        .bind(value)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(name, value, "status entry set");
        Ok(row)
    }

    /// Returns the entries among `names` that exist, in `names` order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the query fails.
    pub async fn list(&self, names: &[&str]) -> Result<Vec<StatusEntryRow>, DbError> {
        let names: Vec<String> = names.iter().map(|n| (*n).to_string()).collect();

        let rows = sqlx::query_as::<_, StatusEntryRow>(
            "SELECT s.name, s.value, s.updated_at \
             FROM UNNEST($1::text[]) WITH ORDINALITY AS wanted(name, ord) \
             JOIN status_entries s ON s.name = wanted.name \
             ORDER BY wanted.ord",
        )
        .bind(&names)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
