//! Database operations for `job_runs`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `job_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub kind: String,
    pub status: String,
    pub pid: Option<i32>,
    pub log_path: String,
    pub exit_code: Option<i32>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

const JOB_RUN_COLUMNS: &str = "id, public_id, kind, status, pid, log_path, exit_code, \
     error_message, created_at, started_at, completed_at";

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Records a new job in `queued` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_job_run(pool: &PgPool, kind: &str, log_path: &str) -> Result<JobRunRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, JobRunRow>(&format!(
        "INSERT INTO job_runs (public_id, kind, status, log_path) \
         VALUES ($1, $2, 'queued', $3) \
         RETURNING {JOB_RUN_COLUMNS}"
    ))
    .bind(public_id)
    .bind(kind)
    .bind(log_path)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a queued job `running` with the spawned process id.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobRunTransition`] if the job is not queued, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn start_job_run(pool: &PgPool, id: i64, pid: Option<i32>) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE job_runs \
         SET status = 'running', pid = $1, started_at = NOW() \
         WHERE id = $2 AND status = 'queued'",
    )
    .bind(pid)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobRunTransition {
            id,
            expected_status: "queued",
        });
    }
    Ok(())
}

/// Records the exit of a running job: `succeeded` when `exit_code` is `0`,
/// `failed` otherwise. A `None` exit code (killed by a signal) counts as
/// failure.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobRunTransition`] if the job is not running, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn finish_job_run(pool: &PgPool, id: i64, exit_code: Option<i32>) -> Result<(), DbError> {
    let status = if exit_code == Some(0) {
        "succeeded"
    } else {
        "failed"
    };

    let result = sqlx::query(
        "UPDATE job_runs \
         SET status = $1, exit_code = $2, completed_at = NOW() \
         WHERE id = $3 AND status = 'running'",
    )
    .bind(status)
    .bind(exit_code)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobRunTransition {
            id,
            expected_status: "running",
        });
    }
    Ok(())
}

/// Marks a queued or running job `failed` with an error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobRunTransition`] if the job already finished,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn fail_job_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE job_runs \
         SET status = 'failed', error_message = $1, completed_at = NOW() \
         WHERE id = $2 AND status IN ('queued', 'running')",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobRunTransition {
            id,
            expected_status: "queued or running",
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Fetches a job by its public id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no job has `public_id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_job_run(pool: &PgPool, public_id: Uuid) -> Result<JobRunRow, DbError> {
    sqlx::query_as::<_, JobRunRow>(&format!(
        "SELECT {JOB_RUN_COLUMNS} FROM job_runs WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns the most recent `limit` jobs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_job_runs(pool: &PgPool, limit: i64) -> Result<Vec<JobRunRow>, DbError> {
    let rows = sqlx::query_as::<_, JobRunRow>(&format!(
        "SELECT {JOB_RUN_COLUMNS} FROM job_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
