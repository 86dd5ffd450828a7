use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use partsdb_core::status::{is_valid_name, WELL_KNOWN_KEYS};
use partsdb_db::StatusEntryRow;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

const MAX_VALUE_LEN: usize = 1024;

#[derive(Debug, Deserialize)]
pub(super) struct SetStatusRequest {
    pub value: String,
}

/// A status entry; `value` and `updated_at` are `None` until a worker has
/// reported it.
#[derive(Debug, Serialize)]
pub(super) struct StatusItem {
    name: String,
    value: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<StatusEntryRow> for StatusItem {
    fn from(row: StatusEntryRow) -> Self {
        Self {
            name: row.name,
            value: Some(row.value),
            updated_at: Some(row.updated_at),
        }
    }
}

/// GET /api/v1/status
pub(super) async fn list_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<StatusItem>>>, ApiError> {
    let rows = state
        .status
        .list(&WELL_KNOWN_KEYS)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    let items = WELL_KNOWN_KEYS
        .iter()
        .map(|name| {
            rows.iter()
                .find(|row| row.name == *name)
                .cloned()
                .map_or_else(
                    || StatusItem {
                        name: (*name).to_string(),
                        value: None,
                        updated_at: None,
                    },
                    StatusItem::from,
                )
        })
        .collect();

    Ok(ApiResponse::new(req_id.0, items))
}

/// PUT /api/v1/status/{name}
pub(super) async fn set_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(name): Path<String>,
    Json(body): Json<SetStatusRequest>,
) -> Result<Json<ApiResponse<StatusItem>>, ApiError> {
    if !is_valid_name(&name) {
        return Err(ApiError::validation(
            &req_id.0,
            format!("invalid status name '{name}'"),
        ));
    }
    if body.value.chars().count() > MAX_VALUE_LEN {
        return Err(ApiError::validation(
            &req_id.0,
            format!("value must be at most {MAX_VALUE_LEN} characters"),
        ));
    }

    let row = state
        .status
        .set(&name, &body.value)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    tracing::info!(name = %row.name, value = %row.value, "status updated");
    Ok(ApiResponse::new(req_id.0, row.into()))
}
