//! Unified error taxonomy for the cache service
//!
//! Every failure a request can hit maps to exactly one variant, and every
//! variant maps to exactly one HTTP status (see `api::error`). Drivers
//! construct `GetInternal`/`PutInternal` directly so the operation that
//! failed is never lost.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// GET for an identifier with no binding
    #[error("Key not found")]
    KeyNotFound,

    /// Put-if-absent collision on an existing key
    #[error("Record exists with provided ID")]
    RecordExists,

    /// GET with a missing or empty uuid parameter
    #[error("Missing required parameter uuid")]
    MissingKey,

    /// Envelope or element validation failure
    #[error("{0}")]
    MalformedRequest(String),

    /// Caller-chosen key without a valid write-authorization secret
    #[error("Caller-chosen keys are not authorized for this request")]
    UnauthorizedKey,

    /// More elements than `max_num_values`
    #[error("More keys than allowed: {0}")]
    TooMany(usize),

    /// Serialized payload larger than `max_size_bytes`
    #[error("Payload exceeds maximum size of {0} bytes")]
    TooLarge(usize),

    /// Negative ttlseconds in a put element
    #[error("ttlseconds must not be negative")]
    NegativeTtl,

    /// Token bucket denied the put attempt
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Backend failure on the write path
    #[error("Put internal error: {0}")]
    PutInternal(String),

    /// Backend failure on the read path
    #[error("Get internal error: {0}")]
    GetInternal(String),

    /// Serialization failure inside the service
    #[error("Marshal error: {0}")]
    Marshal(String),

    /// Stored record does not begin with a known media-type tag
    #[error("Get internal error: malformed record")]
    MalformedRecord,
}

impl CacheError {
    /// Short stable category name, used in metrics labels and response bodies.
    pub fn category(&self) -> &'static str {
        match self {
            CacheError::KeyNotFound => "key_not_found",
            CacheError::RecordExists => "record_exists",
            CacheError::MissingKey => "missing_key",
            CacheError::MalformedRequest(_) => "bad_request",
            CacheError::UnauthorizedKey => "unauthorized_key",
            CacheError::TooMany(_) => "too_many",
            CacheError::TooLarge(_) => "too_large",
            CacheError::NegativeTtl => "negative_ttl",
            CacheError::RateLimited => "rate_limited",
            CacheError::PutInternal(_) => "put_internal",
            CacheError::GetInternal(_) => "get_internal",
            CacheError::Marshal(_) => "marshal_error",
            CacheError::MalformedRecord => "malformed_record",
        }
    }

    /// Whether this error came from the backend rather than request validation.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            CacheError::PutInternal(_)
                | CacheError::GetInternal(_)
                | CacheError::Marshal(_)
                | CacheError::MalformedRecord
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(CacheError::KeyNotFound.to_string(), "Key not found");
        assert_eq!(
            CacheError::TooMany(10).to_string(),
            "More keys than allowed: 10"
        );
        assert_eq!(
            CacheError::PutInternal("boom".into()).to_string(),
            "Put internal error: boom"
        );
    }

    #[test]
    fn test_categories_are_stable() {
        assert_eq!(CacheError::RecordExists.category(), "record_exists");
        assert_eq!(CacheError::RateLimited.category(), "rate_limited");
        assert_eq!(
            CacheError::MalformedRequest("x".into()).category(),
            "bad_request"
        );
        assert_eq!(CacheError::MalformedRecord.category(), "malformed_record");
    }

    #[test]
    fn test_internal_classification() {
        assert!(CacheError::GetInternal("io".into()).is_internal());
        assert!(CacheError::MalformedRecord.is_internal());
        assert!(!CacheError::KeyNotFound.is_internal());
        assert!(!CacheError::RateLimited.is_internal());
    }
}
