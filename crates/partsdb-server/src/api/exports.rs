use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Extension,
};

use crate::middleware::RequestId;

use super::{ApiError, AppState};

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// GET /api/v1/exports/products.xlsx
///
/// Serves the spreadsheet the external update scripts leave at the
/// configured export path.
pub(super) async fn download_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Response, ApiError> {
    let path = &state.config.export_path;
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found(&req_id.0, "products export"));
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to read export");
            return Err(ApiError::new(
                req_id.0,
                "internal_error",
                "failed to read export",
            ));
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"products.xlsx\"",
            ),
        ],
        bytes,
    )
        .into_response())
}
