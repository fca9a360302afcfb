//! Liveness and version endpoints

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
}

/// `GET /status` — 204 while the process is serving
pub async fn status() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

/// `GET /version` — the crate version baked in at compile time
pub async fn version() -> impl IntoResponse {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;

    use super::*;

    #[tokio::test]
    async fn test_status_is_no_content() {
        let response = status().await.into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_version_reports_crate_version() {
        let response = version().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
