//! HTTP mapping for the error taxonomy
//!
//! Each error kind maps to exactly one status code; the body carries the
//! stable category and a short reason so clients can branch without parsing
//! prose.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::data::error::CacheError;

/// Response wrapper for taxonomy errors
pub struct ApiError(pub CacheError);

/// Status code assigned to each error kind.
pub fn status_code(error: &CacheError) -> StatusCode {
    match error {
        CacheError::KeyNotFound => StatusCode::NOT_FOUND,
        CacheError::RecordExists
        | CacheError::MissingKey
        | CacheError::MalformedRequest(_)
        | CacheError::UnauthorizedKey
        | CacheError::TooMany(_)
        | CacheError::TooLarge(_)
        | CacheError::NegativeTtl => StatusCode::BAD_REQUEST,
        CacheError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        CacheError::PutInternal(_)
        | CacheError::GetInternal(_)
        | CacheError::Marshal(_)
        | CacheError::MalformedRecord => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_code(&self.0);

        // Internal failure details stay in the logs; clients get the category
        let message = if self.0.is_internal() {
            tracing::error!(category = self.0.category(), error = %self.0, "Request failed");
            self.0.category().to_string()
        } else {
            self.0.to_string()
        };

        let body = json!({
            "error": self.0.category(),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_code(&CacheError::KeyNotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_code(&CacheError::RecordExists),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_code(&CacheError::MissingKey), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_code(&CacheError::MalformedRequest("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_code(&CacheError::UnauthorizedKey),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_code(&CacheError::TooMany(11)), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_code(&CacheError::TooLarge(10_240)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_code(&CacheError::NegativeTtl), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_code(&CacheError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_code(&CacheError::PutInternal("io".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_code(&CacheError::GetInternal("io".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_code(&CacheError::Marshal("bad".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_code(&CacheError::MalformedRecord),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_response_status() {
        let response = ApiError(CacheError::RateLimited).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let response = ApiError(CacheError::KeyNotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
