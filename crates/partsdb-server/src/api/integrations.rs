//! Integration groups and their brand/article replacement mappings.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use partsdb_db::{IntegrationGroupRow, IntegrationMappingRow, MappingFields};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, Page};

const MAX_FIELD_LEN: usize = 255;

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct GroupRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MappingRequest {
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub article: String,
    pub description: Option<String>,
    #[serde(default)]
    pub brand_replace: String,
    #[serde(default)]
    pub article_replace: String,
    pub description_replace: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BulkMappingsRequest {
    pub mappings: Vec<MappingRequest>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct GroupItem {
    id: i64,
    name: String,
    description: Option<String>,
    mapping_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<IntegrationGroupRow> for GroupItem {
    fn from(row: IntegrationGroupRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            mapping_count: row.mapping_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct MappingItem {
    id: i64,
    group_id: i64,
    brand: String,
    article: String,
    description: Option<String>,
    brand_replace: String,
    article_replace: String,
    description_replace: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<IntegrationMappingRow> for MappingItem {
    fn from(row: IntegrationMappingRow) -> Self {
        Self {
            id: row.id,
            group_id: row.group_id,
            brand: row.brand,
            article: row.article,
            description: row.description,
            brand_replace: row.brand_replace,
            article_replace: row.article_replace,
            description_replace: row.description_replace,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl MappingRequest {
    /// Trimmed fields ready for the database, or the first problem found.
    fn fields(&self) -> Result<MappingFields<'_>, String> {
        let required = [
            ("brand", self.brand.trim()),
            ("article", self.article.trim()),
            ("brand_replace", self.brand_replace.trim()),
            ("article_replace", self.article_replace.trim()),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(format!("{name} is required"));
            }
        }

        let optional = [
            ("description", self.description.as_deref()),
            ("description_replace", self.description_replace.as_deref()),
        ];
        for (name, value) in required
            .iter()
            .map(|(n, v)| (*n, Some(*v)))
            .chain(optional)
        {
            if value.is_some_and(|v| v.chars().count() > MAX_FIELD_LEN) {
                return Err(format!("{name} must be at most {MAX_FIELD_LEN} characters"));
            }
        }

        Ok(MappingFields {
            brand: required[0].1,
            article: required[1].1,
            description: blank_to_none(self.description.as_deref()),
            brand_replace: required[2].1,
            article_replace: required[3].1,
            description_replace: blank_to_none(self.description_replace.as_deref()),
        })
    }
}

fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn validate_group(req_id: &str, body: &GroupRequest) -> Result<(), ApiError> {
    let name = body.name.trim();
    if name.is_empty() || name.chars().count() > MAX_FIELD_LEN {
        return Err(ApiError::validation(
            req_id,
            format!("name must be 1-{MAX_FIELD_LEN} characters"),
        ));
    }
    Ok(())
}

async fn ensure_group(state: &AppState, req_id: &str, id: i64) -> Result<(), ApiError> {
    partsdb_db::get_group(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id, &e))?
        .map(|_| ())
        .ok_or_else(|| ApiError::not_found(req_id, format_args!("integration {id}")))
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// GET /api/v1/integrations
pub(super) async fn list_groups(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<GroupItem>>>, ApiError> {
    let rows = partsdb_db::list_groups(&state.pool)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok(ApiResponse::new(
        req_id.0,
        rows.into_iter().map(GroupItem::from).collect(),
    ))
}

/// GET /api/v1/integrations/{id}
pub(super) async fn get_group(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<GroupItem>>, ApiError> {
    let row = partsdb_db::get_group(&state.pool, id)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?
        .ok_or_else(|| ApiError::not_found(&req_id.0, format_args!("integration {id}")))?;

    Ok(ApiResponse::new(req_id.0, row.into()))
}

/// POST /api/v1/integrations
pub(super) async fn create_group(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<GroupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>), ApiError> {
    validate_group(&req_id.0, &body)?;

    let id = partsdb_db::create_group(
        &state.pool,
        body.name.trim(),
        blank_to_none(body.description.as_deref()),
    )
    .await
    .map_err(|e| map_db_error(&req_id.0, &e))?;

    tracing::info!(id, name = %body.name.trim(), "integration group created");
    Ok((
        StatusCode::CREATED,
        ApiResponse::new(req_id.0, serde_json::json!({ "id": id })),
    ))
}

/// PUT /api/v1/integrations/{id}
pub(super) async fn update_group(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<GroupRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    validate_group(&req_id.0, &body)?;

    partsdb_db::update_group(
        &state.pool,
        id,
        body.name.trim(),
        blank_to_none(body.description.as_deref()),
    )
    .await
    .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok(ApiResponse::new(req_id.0, serde_json::json!({ "id": id })))
}

/// DELETE /api/v1/integrations/{id}
pub(super) async fn delete_group(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    partsdb_db::delete_group(&state.pool, id)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok(ApiResponse::new(req_id.0, serde_json::json!({ "deleted": true })))
}

// ---------------------------------------------------------------------------
// Mappings
// ---------------------------------------------------------------------------

/// GET /api/v1/integrations/{id}/mappings
pub(super) async fn list_mappings(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(group_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Page<MappingItem>>>, ApiError> {
    ensure_group(&state, &req_id.0, group_id).await?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query
        .per_page
        .unwrap_or(partsdb_db::integrations::MAPPINGS_PER_PAGE)
        .clamp(1, 200);
    let (rows, total) =
        partsdb_db::list_mappings(&state.pool, group_id, Some(page), Some(per_page))
            .await
            .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok(ApiResponse::new(
        req_id.0,
        Page {
            items: rows.into_iter().map(MappingItem::from).collect(),
            total,
            page,
            per_page,
        },
    ))
}

/// POST /api/v1/integrations/{id}/mappings
pub(super) async fn create_mapping(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(group_id): Path<i64>,
    Json(body): Json<MappingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MappingItem>>), ApiError> {
    let fields = body
        .fields()
        .map_err(|msg| ApiError::validation(&req_id.0, msg))?;
    ensure_group(&state, &req_id.0, group_id).await?;

    let row = partsdb_db::create_mapping(&state.pool, group_id, fields)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok((StatusCode::CREATED, ApiResponse::new(req_id.0, row.into())))
}

/// POST /api/v1/integrations/{id}/mappings/bulk
///
/// Every row is validated before anything is written; the insert is a single
/// transaction.
pub(super) async fn bulk_create_mappings(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(group_id): Path<i64>,
    Json(body): Json<BulkMappingsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>), ApiError> {
    if body.mappings.is_empty() {
        return Err(ApiError::validation(&req_id.0, "mappings must not be empty"));
    }
    let fields = body
        .mappings
        .iter()
        .enumerate()
        .map(|(i, m)| {
            m.fields()
                .map_err(|msg| ApiError::validation(&req_id.0, format!("row {i}: {msg}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    ensure_group(&state, &req_id.0, group_id).await?;

    let inserted = partsdb_db::bulk_create_mappings(&state.pool, group_id, &fields)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::new(req_id.0, serde_json::json!({ "inserted": inserted })),
    ))
}

/// GET /api/v1/mappings/{id}
pub(super) async fn get_mapping(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<MappingItem>>, ApiError> {
    let row = partsdb_db::get_mapping(&state.pool, id)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?
        .ok_or_else(|| ApiError::not_found(&req_id.0, format_args!("mapping {id}")))?;

    Ok(ApiResponse::new(req_id.0, row.into()))
}

/// PUT /api/v1/mappings/{id}
pub(super) async fn update_mapping(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<MappingRequest>,
) -> Result<Json<ApiResponse<MappingItem>>, ApiError> {
    let fields = body
        .fields()
        .map_err(|msg| ApiError::validation(&req_id.0, msg))?;

    let row = partsdb_db::update_mapping(&state.pool, id, fields)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok(ApiResponse::new(req_id.0, row.into()))
}

/// DELETE /api/v1/mappings/{id}
pub(super) async fn delete_mapping(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    partsdb_db::delete_mapping(&state.pool, id)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok(ApiResponse::new(req_id.0, serde_json::json!({ "deleted": true })))
}
