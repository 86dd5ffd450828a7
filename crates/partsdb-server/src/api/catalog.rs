use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use partsdb_core::{BatchReport, ItemInput};
use partsdb_db::{CatalogItemFilters, CatalogItemRow};
use partsdb_ingest::{DeleteReport, LookupHit};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, map_ingest_error, ApiError, ApiResponse, AppState, Page};

#[derive(Debug, Deserialize)]
pub(super) struct ListItemsQuery {
    pub brand: Option<String>,
    pub article: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BulkUpsertRequest {
    pub items: Vec<ItemInput>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BulkDeleteRequest {
    pub ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LookupRequest {
    pub brand: String,
    pub article: String,
}

#[derive(Debug, Serialize)]
pub(super) struct CatalogItem {
    id: i64,
    brand: String,
    article: String,
    image_path: Option<String>,
    content_sha256: Option<String>,
    byte_size: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CatalogItemRow> for CatalogItem {
    fn from(row: CatalogItemRow) -> Self {
        Self {
            id: row.id,
            brand: row.brand,
            article: row.article,
            image_path: row.image_path,
            content_sha256: row.content_sha256,
            byte_size: row.byte_size,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// GET /api/v1/catalog/items
pub(super) async fn list_items(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListItemsQuery>,
) -> Result<Json<ApiResponse<Page<CatalogItem>>>, ApiError> {
    let per_page = query
        .per_page
        .unwrap_or(partsdb_db::catalog_items::DEFAULT_PER_PAGE)
        .clamp(1, 200);
    let page = query.page.unwrap_or(1).max(1);
    let filters = CatalogItemFilters {
        brand: query.brand,
        article: query.article,
        page: Some(page),
        per_page: Some(per_page),
    };

    let (rows, total) = partsdb_db::list_catalog_items(&state.pool, &filters)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;

    Ok(ApiResponse::new(
        req_id.0,
        Page {
            items: rows.into_iter().map(CatalogItem::from).collect(),
            total,
            page,
            per_page,
        },
    ))
}

/// POST /api/v1/catalog/items/bulk
///
/// Per-item failures are reported inside a `200` response; only a rolled-back
/// batch or an oversized batch fails the whole request.
pub(super) async fn bulk_upsert(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<BulkUpsertRequest>,
) -> Result<Json<ApiResponse<BatchReport>>, ApiError> {
    let report = state
        .catalog
        .bulk_upsert(&body.items)
        .await
        .map_err(|e| map_ingest_error(&req_id.0, &e))?;

    Ok(ApiResponse::new(req_id.0, report))
}

/// POST /api/v1/catalog/items/bulk-delete
pub(super) async fn bulk_delete(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<BulkDeleteRequest>,
) -> Result<Json<ApiResponse<DeleteReport>>, ApiError> {
    if body.ids.is_empty() {
        return Err(ApiError::validation(&req_id.0, "ids must not be empty"));
    }
    let report = state.catalog.delete_items(&body.ids).await;
    Ok(ApiResponse::new(req_id.0, report))
}

/// DELETE /api/v1/catalog/items/{id}
pub(super) async fn delete_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    state
        .catalog
        .delete_item(id)
        .await
        .map_err(|e| map_ingest_error(&req_id.0, &e))?;

    Ok(ApiResponse::new(req_id.0, serde_json::json!({ "deleted": true })))
}

/// POST /api/v1/catalog/lookup
pub(super) async fn lookup(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<LookupRequest>,
) -> Result<Json<ApiResponse<Vec<LookupHit>>>, ApiError> {
    let hits = state
        .catalog
        .lookup(&body.brand, &body.article)
        .await
        .map_err(|e| match e {
            partsdb_ingest::IngestError::NotFound => ApiError::not_found(
                &req_id.0,
                format_args!("images for '{}' '{}'", body.brand, body.article),
            ),
            other => map_ingest_error(&req_id.0, &other),
        })?;

    Ok(ApiResponse::new(req_id.0, hits))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::super::test_support::{send, test_app};

    const PNG: &str = "cG5nMQ=="; // "png1"

    #[sqlx::test(migrations = "../../migrations")]
    async fn bulk_upsert_reports_per_item_outcomes(pool: sqlx::PgPool) {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_app(pool, dir.path());

        let (status, json) = send(
            app.clone(),
            "POST",
            "/api/v1/catalog/items/bulk",
            Some(json!({ "items": [
                { "brand": "ACME Parts", "key": "ab-12_34.png", "payload": PNG },
                { "brand": "acme parts", "key": "ab1234.png", "payload": "!!!" },
            ]})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["items"]["0"]["success"], "image created");
        assert_eq!(json["data"]["items"]["1"]["error"], "invalid payload");
        assert_eq!(json["data"]["created"], 1);
        assert_eq!(json["data"]["failed"], 1);

        let stored = std::fs::read(dir.path().join("uploads/acme parts/ab1234.png"))
            .expect("image stored");
        assert_eq!(stored, b"png1");

        let (status, list) = send(app, "GET", "/api/v1/catalog/items?brand=acme", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["data"]["total"], 1);
        assert_eq!(list["data"]["per_page"], 40);
        assert_eq!(list["data"]["items"][0]["article"], "ab1234");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn oversized_batch_is_payload_too_large(pool: sqlx::PgPool) {
        let dir = tempfile::tempdir().expect("tempdir");
        let items: Vec<_> = (0..11)
            .map(|i| json!({ "brand": "bosch", "key": format!("k{i}") }))
            .collect();

        let (status, json) = send(
            test_app(pool, dir.path()),
            "POST",
            "/api/v1/catalog/items/bulk",
            Some(json!({ "items": items })),
        )
        .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json["error"]["code"], "payload_too_large");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn lookup_returns_urls_and_delete_removes_file(pool: sqlx::PgPool) {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_app(pool, dir.path());
        send(
            app.clone(),
            "POST",
            "/api/v1/catalog/items/bulk",
            Some(json!({ "items": [{ "brand": "Bosch", "key": "0 986 452.png", "payload": PNG }] })),
        )
        .await;

        let (status, hits) = send(
            app.clone(),
            "POST",
            "/api/v1/catalog/lookup",
            Some(json!({ "brand": "BOSCH", "article": "0986" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            hits["data"][0]["url"],
            "http://cdn.local/uploads/bosch/0986452.png"
        );
        let id = hits["data"][0]["id"].as_i64().expect("id");

        let (status, _) = send(
            app.clone(),
            "DELETE",
            &format!("/api/v1/catalog/items/{id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(!dir.path().join("uploads/bosch/0986452.png").exists());

        let (status, json) = send(
            app,
            "POST",
            "/api/v1/catalog/lookup",
            Some(json!({ "brand": "bosch", "article": "0986" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "not_found");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn bulk_delete_reports_failed_ids(pool: sqlx::PgPool) {
        let dir = tempfile::tempdir().expect("tempdir");
        let (status, json) = send(
            test_app(pool, dir.path()),
            "POST",
            "/api/v1/catalog/items/bulk-delete",
            Some(json!({ "ids": [404] })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["deleted"], json!([]));
        assert_eq!(json["data"]["failed"], json!([404]));
    }
}
