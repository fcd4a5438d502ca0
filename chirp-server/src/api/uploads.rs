use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::{
    api::{ApiError, ApiResult},
    images::content_type_for,
    state::AppState,
};

/// Sent with every upload so script inside an SVG never runs
const UPLOAD_CSP: &str = "sandbox; default-src 'none'; style-src 'unsafe-inline'";

/// GET /uploads/:file - Raw bytes of a stored image
pub async fn get_upload(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> ApiResult<Response> {
    let bytes = state
        .images
        .read(&file_name)
        .await
        .map_err(|e| ApiError::InternalError(format!("Failed to read upload: {}", e)))?
        .ok_or_else(|| ApiError::NotFound("File not found".to_string()))?;

    let headers = [
        (header::CONTENT_TYPE, content_type_for(&file_name)),
        (header::CONTENT_SECURITY_POLICY, UPLOAD_CSP),
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    ];
    Ok((headers, bytes).into_response())
}
