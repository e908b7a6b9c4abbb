//! Error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use sitesurvey_shared::AppError;
use tracing::{error, warn};

/// Render an error as `{"error": <code>, "message": <message>}`.
///
/// Server-side failures are logged here with their full detail; the body
/// only carries [`AppError::public_message`].
pub fn error_response(err: impl Into<AppError>) -> Response {
    let err = err.into();
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if err.is_client_error() {
        warn!(status = status.as_u16(), error = %err, "Request rejected");
    } else {
        error!(status = status.as_u16(), error = %err, "Request failed");
    }

    (
        status,
        Json(json!({
            "error": err.error_code(),
            "message": err.public_message(),
        })),
    )
        .into_response()
}
