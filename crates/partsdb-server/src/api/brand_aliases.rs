//! Brand alias administration and the resolver endpoint.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use partsdb_core::{pick_canonical, BrandMatch, ALIAS_DELIMITER};
use partsdb_db::BrandAliasRow;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

const MAX_NAME_LEN: usize = 255;

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ResolveQuery {
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateBrandAliasRequest {
    pub canonical_brand: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateBrandAliasRequest {
    pub canonical_brand: Option<String>,
    pub aliases: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub(super) struct BrandAliasItem {
    id: i64,
    canonical_brand: String,
    aliases: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BrandAliasRow> for BrandAliasItem {
    fn from(row: BrandAliasRow) -> Self {
        Self {
            aliases: row.aliases(),
            id: row.id,
            canonical_brand: row.canonical_brand,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ResolveResult {
    query: String,
    matches: Vec<BrandMatch>,
    /// Canonical brand a caller should use; `None` means "fall back to the query".
    chosen: Option<String>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_canonical(req_id: &str, raw: &str) -> Result<String, ApiError> {
    let name = raw.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::validation(
            req_id,
            format!("canonical_brand must be 1-{MAX_NAME_LEN} characters"),
        ));
    }
    Ok(name.to_owned())
}

fn validate_aliases(req_id: &str, aliases: &[String]) -> Result<(), ApiError> {
    let delimiter = ALIAS_DELIMITER.trim();
    match aliases.iter().find(|a| a.contains(delimiter)) {
        Some(bad) => Err(ApiError::validation(
            req_id,
            format!("alias '{bad}' must not contain '{delimiter}'"),
        )),
        None => Ok(()),
    }
}

fn map_write_error(req_id: &str, e: &partsdb_db::DbError) -> ApiError {
    if e.is_unique_violation() {
        return ApiError::new(req_id, "conflict", "a brand with that canonical name already exists");
    }
    map_db_error(req_id, e)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/brand-aliases
pub(super) async fn list_brand_aliases(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<BrandAliasItem>>>, ApiError> {
    let rows = partsdb_db::list_brand_aliases(&state.pool, query.q.as_deref())
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok(ApiResponse::new(
        req_id.0,
        rows.into_iter().map(BrandAliasItem::from).collect(),
    ))
}

/// GET /api/v1/brand-aliases/{id}
pub(super) async fn get_brand_alias(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<BrandAliasItem>>, ApiError> {
    let row = partsdb_db::get_brand_alias(&state.pool, id)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?
        .ok_or_else(|| ApiError::not_found(&req_id.0, format_args!("brand alias {id}")))?;

    Ok(ApiResponse::new(req_id.0, row.into()))
}

/// POST /api/v1/brand-aliases
pub(super) async fn create_brand_alias(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateBrandAliasRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BrandAliasItem>>), ApiError> {
    let rid = &req_id.0;
    let canonical = validate_canonical(rid, &body.canonical_brand)?;
    validate_aliases(rid, &body.aliases)?;

    let row = partsdb_db::create_brand_alias(&state.pool, &canonical, &body.aliases)
        .await
        .map_err(|e| map_write_error(rid, &e))?;

    tracing::info!(id = row.id, canonical_brand = %row.canonical_brand, "brand alias created");
    Ok((StatusCode::CREATED, ApiResponse::new(req_id.0, row.into())))
}

/// PATCH /api/v1/brand-aliases/{id}
pub(super) async fn update_brand_alias(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateBrandAliasRequest>,
) -> Result<Json<ApiResponse<BrandAliasItem>>, ApiError> {
    let rid = &req_id.0;
    let canonical = body
        .canonical_brand
        .as_deref()
        .map(|c| validate_canonical(rid, c))
        .transpose()?;
    if let Some(aliases) = &body.aliases {
        validate_aliases(rid, aliases)?;
    }

    let row = partsdb_db::update_brand_alias(
        &state.pool,
        id,
        canonical.as_deref(),
        body.aliases.as_deref(),
    )
    .await
    .map_err(|e| map_write_error(rid, &e))?;

    Ok(ApiResponse::new(req_id.0, row.into()))
}

/// DELETE /api/v1/brand-aliases/{id}/aliases
pub(super) async fn clear_brand_aliases(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<BrandAliasItem>>, ApiError> {
    let row = partsdb_db::clear_brand_aliases(&state.pool, id)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok(ApiResponse::new(req_id.0, row.into()))
}

/// DELETE /api/v1/brand-aliases/{id}
pub(super) async fn delete_brand_alias(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    partsdb_db::delete_brand_alias(&state.pool, id)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok(ApiResponse::new(req_id.0, serde_json::json!({ "deleted": true })))
}

/// GET /api/v1/brand-aliases/resolve?q=
pub(super) async fn resolve_brand(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<ApiResponse<ResolveResult>>, ApiError> {
    let matches = partsdb_db::resolve_brand(&state.pool, &query.q)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;
    let chosen = pick_canonical(&matches).map(|m| m.canonical_brand.clone());

    Ok(ApiResponse::new(
        req_id.0,
        ResolveResult {
            query: query.q,
            matches,
            chosen,
        },
    ))
}
