//! Stored file proxy.

use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use sitesurvey_core::storage::RemoteStorage;
use tracing::warn;

use crate::AppState;

/// Creates the file routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/files/{*path}", get(serve_file))
}

/// GET `/files/{*path}` - Stream a stored object.
///
/// Any remote failure is a plain `404`.
async fn serve_file(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    match state.storage.get_stream(&path).await {
        Ok(stream) => {
            let mut response = Body::from_stream(stream).into_response();
            let headers = response.headers_mut();

            let content_type = mime_guess::from_path(&path).first_or_octet_stream();
            if let Ok(value) = HeaderValue::from_str(content_type.as_ref()) {
                headers.insert(header::CONTENT_TYPE, value);
            }

            let file_name = path.rsplit('/').next().unwrap_or(&path);
            if let Ok(value) = HeaderValue::from_str(&format!("inline; filename=\"{file_name}\"")) {
                headers.insert(header::CONTENT_DISPOSITION, value);
            }

            response
        }
        Err(e) => {
            warn!(path = %path, error = %e, "File not served");
            (StatusCode::NOT_FOUND, "File not found").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    #[rstest]
    #[case("dealers/acme/1-a.jpg", "image/jpeg")]
    #[case("dealers/acme/1-a.JPEG", "image/jpeg")]
    #[case("surveys/acme/7/2-b.png", "image/png")]
    #[case("x.webp", "image/webp")]
    #[case("x.gif", "image/gif")]
    #[case("no-extension", "application/octet-stream")]
    fn test_content_type_guess(#[case] path: &str, #[case] expected: &str) {
        let guessed = mime_guess::from_path(path).first_or_octet_stream();
        assert_eq!(guessed.essence_str(), expected);
    }
}
