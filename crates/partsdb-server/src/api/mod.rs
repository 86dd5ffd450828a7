mod brand_aliases;
mod catalog;
mod exports;
mod integrations;
mod jobs;
mod status;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use partsdb_core::AppConfig;
use partsdb_db::{DbError, StatusStore};
use partsdb_ingest::{CatalogService, IngestError};
use partsdb_jobs::JobLauncher;
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{request_id, RequestId, REQUEST_ID_HEADER};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub catalog: CatalogService,
    pub status: StatusStore,
    pub jobs: JobLauncher,
    pub config: Arc<AppConfig>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// One page of a listing plus paging metadata.
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: String, data: T) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    pub(super) fn not_found(request_id: &str, what: impl std::fmt::Display) -> Self {
        Self::new(request_id, "not_found", format!("{what} not found"))
    }

    pub(super) fn validation(request_id: &str, message: impl Into<String>) -> Self {
        Self::new(request_id, "validation_error", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "payload_too_large" => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: &str, error: &DbError) -> ApiError {
    if matches!(error, DbError::NotFound) {
        return ApiError::new(request_id, "not_found", "record not found");
    }
    if error.is_unique_violation() {
        return ApiError::new(request_id, "conflict", "record already exists");
    }
    if error.is_foreign_key_violation() {
        return ApiError::validation(request_id, "referenced record does not exist");
    }
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

pub(super) fn map_ingest_error(request_id: &str, error: &IngestError) -> ApiError {
    match error {
        IngestError::NotFound => ApiError::not_found(request_id, "catalog item"),
        IngestError::BatchTooLarge { .. } => {
            ApiError::new(request_id, "payload_too_large", error.to_string())
        }
        IngestError::Key(e) => ApiError::validation(request_id, e.to_string()),
        IngestError::RolledBack(_) => {
            ApiError::new(request_id, "internal_error", error.to_string())
        }
        IngestError::Storage(e) => {
            tracing::error!(error = %e, "blob storage failed");
            ApiError::new(request_id, "internal_error", "storage operation failed")
        }
        IngestError::Db(e) => map_db_error(request_id, e),
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/brand-aliases",
            get(brand_aliases::list_brand_aliases).post(brand_aliases::create_brand_alias),
        )
        .route(
            "/api/v1/brand-aliases/resolve",
            get(brand_aliases::resolve_brand),
        )
        .route(
            "/api/v1/brand-aliases/{id}",
            get(brand_aliases::get_brand_alias)
                .patch(brand_aliases::update_brand_alias)
                .delete(brand_aliases::delete_brand_alias),
        )
        .route(
            "/api/v1/brand-aliases/{id}/aliases",
            delete(brand_aliases::clear_brand_aliases),
        )
        .route("/api/v1/catalog/items", get(catalog::list_items))
        .route("/api/v1/catalog/items/bulk", post(catalog::bulk_upsert))
        .route(
            "/api/v1/catalog/items/bulk-delete",
            post(catalog::bulk_delete),
        )
        .route("/api/v1/catalog/items/{id}", delete(catalog::delete_item))
        .route("/api/v1/catalog/lookup", post(catalog::lookup))
        .route(
            "/api/v1/integrations",
            get(integrations::list_groups).post(integrations::create_group),
        )
        .route(
            "/api/v1/integrations/{id}",
            get(integrations::get_group)
                .put(integrations::update_group)
                .delete(integrations::delete_group),
        )
        .route(
            "/api/v1/integrations/{id}/mappings",
            get(integrations::list_mappings).post(integrations::create_mapping),
        )
        .route(
            "/api/v1/integrations/{id}/mappings/bulk",
            post(integrations::bulk_create_mappings),
        )
        .route(
            "/api/v1/mappings/{id}",
            get(integrations::get_mapping)
                .put(integrations::update_mapping)
                .delete(integrations::delete_mapping),
        )
        .route("/api/v1/status", get(status::list_status))
        .route("/api/v1/status/{name}", put(status::set_status))
        .route("/api/v1/jobs", get(jobs::list_jobs).post(jobs::submit_job))
        .route("/api/v1/jobs/{public_id}", get(jobs::get_job))
        .route(
            "/api/v1/exports/products.xlsx",
            get(exports::download_products),
        )
}

pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.max_request_bytes;

    Router::new()
        .route("/api/v1/health", get(health))
        .merge(api_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id))
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match partsdb_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use partsdb_core::{AppConfig, Environment, JobsConfig};
    use partsdb_ingest::{CatalogService, CatalogSettings, LocalBlobStore, PgCatalogStore};
    use partsdb_jobs::JobLauncher;
    use tower::ServiceExt;

    use super::{build_app, AppState};

    pub fn test_config(dir: &Path) -> AppConfig {
        AppConfig {
            database_url: "postgres://unused".to_string(),
            env: Environment::Test,
            bind_addr: "127.0.0.1:0".parse().expect("addr"),
            log_level: "info".to_string(),
            aliases_path: dir.join("brand_aliases.yaml"),
            storage_root: dir.join("uploads"),
            public_base_url: "http://cdn.local/uploads".to_string(),
            export_path: dir.join("products.xlsx"),
            db_max_connections: 5,
            db_min_connections: 1,
            db_acquire_timeout_secs: 5,
            max_batch_items: 10,
            max_payload_bytes: 1024,
            max_request_bytes: 1024 * 1024,
            jobs: JobsConfig {
                python: "sh".to_string(),
                price_photo_script: dir.join("price_photo.sh"),
                trast_script: dir.join("trast.sh"),
                log_dir: dir.join("logs"),
            },
        }
    }

    pub fn test_app(pool: sqlx::PgPool, dir: &Path) -> Router {
        let config = Arc::new(test_config(dir));
        let catalog = CatalogService::new(
            Arc::new(PgCatalogStore::new(pool.clone())),
            LocalBlobStore::new(&config.storage_root),
            CatalogSettings::from_app_config(&config),
        );
        build_app(AppState {
            status: partsdb_db::StatusStore::new(pool.clone()),
            jobs: JobLauncher::new(pool.clone(), config.jobs.clone()),
            pool,
            catalog,
            config,
        })
    }

    /// Send a request and return the status plus the parsed JSON body
    /// (`Value::Null` for empty or non-JSON bodies).
    pub async fn send(
        app: Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{send, test_app};
    use super::*;

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_codes_map_to_statuses() {
        let cases = [
            ("not_found", StatusCode::NOT_FOUND),
            ("validation_error", StatusCode::BAD_REQUEST),
            ("bad_request", StatusCode::BAD_REQUEST),
            ("conflict", StatusCode::CONFLICT),
            ("payload_too_large", StatusCode::PAYLOAD_TOO_LARGE),
            ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (code, status) in cases {
            let response = ApiError::new("req-1", code, "message").into_response();
            assert_eq!(response.status(), status, "code {code}");
        }
    }

    #[test]
    fn oversized_batch_maps_to_payload_too_large() {
        let error = IngestError::BatchTooLarge {
            count: 11,
            limit: 10,
        };
        let api = map_ingest_error("req-1", &error);
        assert_eq!(api.error.code, "payload_too_large");
    }

    #[test]
    fn missing_record_maps_to_not_found() {
        let api = map_db_error("req-1", &DbError::NotFound);
        assert_eq!(api.error.code, "not_found");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn health_reports_ok(pool: sqlx::PgPool) {
        let dir = tempfile::tempdir().expect("tempdir");
        let (status, json) = send(test_app(pool, dir.path()), "GET", "/api/v1/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "ok");
        assert!(json["meta"]["request_id"].is_string());
    }
}
