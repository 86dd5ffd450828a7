use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use partsdb_core::JobKind;
use partsdb_db::JobRunRow;
use partsdb_jobs::{JobError, JobHandle};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct SubmitJobRequest {
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListJobsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct JobRunItem {
    public_id: Uuid,
    kind: String,
    status: String,
    pid: Option<i32>,
    log_path: String,
    exit_code: Option<i32>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<JobRunRow> for JobRunItem {
    fn from(row: JobRunRow) -> Self {
        Self {
            public_id: row.public_id,
            kind: row.kind,
            status: row.status,
            pid: row.pid,
            log_path: row.log_path,
            exit_code: row.exit_code,
            error_message: row.error_message,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        }
    }
}

fn map_job_error(req_id: &str, error: &JobError) -> ApiError {
    match error {
        JobError::Db(e) => map_db_error(req_id, e),
        JobError::Log { .. } | JobError::Spawn { .. } => {
            ApiError::new(req_id, "internal_error", error.to_string())
        }
    }
}

/// POST /api/v1/jobs
///
/// Returns `202 Accepted` as soon as the process is running; progress is
/// polled through `GET /api/v1/jobs/{public_id}` and the status store.
pub(super) async fn submit_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SubmitJobRequest>,
) -> Result<(StatusCode, Json<ApiResponse<JobHandle>>), ApiError> {
    let kind: JobKind = body
        .kind
        .parse()
        .map_err(|msg: String| ApiError::validation(&req_id.0, msg))?;

    let handle = state
        .jobs
        .submit(kind)
        .await
        .map_err(|e| map_job_error(&req_id.0, &e))?;

    Ok((StatusCode::ACCEPTED, ApiResponse::new(req_id.0, handle)))
}

/// GET /api/v1/jobs
pub(super) async fn list_jobs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<ApiResponse<Vec<JobRunItem>>>, ApiError> {
    let rows = partsdb_db::list_job_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok(ApiResponse::new(
        req_id.0,
        rows.into_iter().map(JobRunItem::from).collect(),
    ))
}

/// GET /api/v1/jobs/{public_id}
pub(super) async fn get_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(public_id): Path<Uuid>,
) -> Result<Json<ApiResponse<JobRunItem>>, ApiError> {
    let row = partsdb_db::get_job_run(&state.pool, public_id)
        .await
        .map_err(|e| match e {
            partsdb_db::DbError::NotFound => {
                ApiError::not_found(&req_id.0, format_args!("job {public_id}"))
            }
            other => map_db_error(&req_id.0, &other),
        })?;

    Ok(ApiResponse::new(req_id.0, row.into()))
}
