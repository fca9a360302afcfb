//! Cache endpoints
//!
//! `POST /cache` accepts a batch envelope of payloads and answers with the
//! identifiers they were stored under, in request order. `GET /cache?uuid=`
//! returns one payload with its original media type. All request semantics —
//! validation order, TTL capping, caller-chosen key authorization, the
//! whole-batch failure policy — live in [`CacheService`] so they can be
//! exercised directly in tests; the axum handlers stay thin.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::core::config::AppConfig;
use crate::core::constants::WRITE_SECRET_HEADER;
use crate::data::backend::Backend;
use crate::data::error::CacheError;
use crate::data::record::{self, PayloadType};
use crate::metrics::{Metrics, Op, Outcome};
use crate::utils::ids;

/// One element of the put envelope
///
/// `type` stays a raw string here: elements are validated one at a time, in
/// request order, so an invalid type on a later element must not mask an
/// earlier element's failure at deserialization time.
#[derive(Debug, Deserialize)]
pub struct PutElement {
    #[serde(rename = "type")]
    pub payload_type: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub ttlseconds: i64,
    #[serde(default)]
    pub key: Option<String>,
}

/// Request envelope for `POST /cache`
#[derive(Debug, Deserialize)]
pub struct PutRequest {
    pub puts: Vec<PutElement>,
}

#[derive(Debug, Serialize)]
pub struct PutResponseObject {
    pub uuid: String,
}

/// Response envelope, identifiers in request order
#[derive(Debug, Serialize)]
pub struct PutResponse {
    pub responses: Vec<PutResponseObject>,
}

#[derive(Debug, Deserialize)]
pub struct PutQuery {
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GetQuery {
    pub uuid: Option<String>,
}

/// Request-processing core shared by both handlers
pub struct CacheService {
    backend: Arc<dyn Backend>,
    metrics: Arc<dyn Metrics>,
    max_num_values: usize,
    max_size_bytes: usize,
    max_ttl_seconds: u64,
    allow_keys: bool,
    api_key: Option<String>,
    read_timeout: std::time::Duration,
    write_timeout: std::time::Duration,
}

/// A validated element, ready to write
struct PreparedPut {
    key: String,
    record: Vec<u8>,
    ttl_seconds: u64,
}

impl CacheService {
    pub fn new(config: &AppConfig, backend: Arc<dyn Backend>, metrics: Arc<dyn Metrics>) -> Self {
        Self {
            backend,
            metrics,
            max_num_values: config.server.max_num_values,
            max_size_bytes: config.server.max_size_bytes,
            max_ttl_seconds: config.ttl.max_ttl_seconds,
            allow_keys: config.server.allow_keys,
            api_key: config.server.api_key.clone(),
            read_timeout: config.server.read_timeout,
            write_timeout: config.server.write_timeout,
        }
    }

    pub fn metrics(&self) -> &Arc<dyn Metrics> {
        &self.metrics
    }

    /// Validate and store a batch of payloads.
    ///
    /// All elements are validated before anything is written, so a rejected
    /// envelope never leaves partial state. Once writes start, the first
    /// backend failure fails the whole request; records already written stay
    /// written (at-least-once from the client's perspective).
    pub async fn put_batch(
        &self,
        request: PutRequest,
        secret: Option<&str>,
    ) -> Result<PutResponse, CacheError> {
        if request.puts.len() > self.max_num_values {
            return Err(CacheError::TooMany(self.max_num_values));
        }

        let mut prepared = Vec::with_capacity(request.puts.len());
        for element in &request.puts {
            prepared.push(self.prepare(element, secret)?);
        }

        let mut responses = Vec::with_capacity(prepared.len());
        for put in prepared {
            match tokio::time::timeout(
                self.write_timeout,
                self.backend.put(&put.key, &put.record, put.ttl_seconds),
            )
            .await
            {
                Ok(Ok(())) => responses.push(PutResponseObject { uuid: put.key }),
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    return Err(CacheError::PutInternal("backend call timed out".into()));
                }
            }
        }

        Ok(PutResponse { responses })
    }

    /// Fetch one payload and restore its media type.
    pub async fn fetch(&self, uuid: &str) -> Result<(PayloadType, Vec<u8>), CacheError> {
        if uuid.is_empty() {
            return Err(CacheError::MissingKey);
        }

        let stored = match tokio::time::timeout(self.read_timeout, self.backend.get(uuid)).await {
            Ok(result) => result?,
            Err(_) => return Err(CacheError::GetInternal("backend call timed out".into())),
        };

        let (payload_type, payload) = record::unframe(&stored)?;
        Ok((payload_type, payload.to_vec()))
    }

    fn prepare(&self, element: &PutElement, secret: Option<&str>) -> Result<PreparedPut, CacheError> {
        let payload_type = match element.payload_type.as_str() {
            "json" => PayloadType::Json,
            "xml" => PayloadType::Xml,
            other => {
                return Err(CacheError::MalformedRequest(format!(
                    "type must be \"json\" or \"xml\", found \"{other}\""
                )));
            }
        };

        if element.ttlseconds < 0 {
            return Err(CacheError::NegativeTtl);
        }

        let payload = match payload_type {
            PayloadType::Json => serde_json::to_vec(&element.value)
                .map_err(|e| CacheError::Marshal(e.to_string()))?,
            PayloadType::Xml => match &element.value {
                serde_json::Value::String(s) => s.clone().into_bytes(),
                _ => {
                    return Err(CacheError::MalformedRequest(
                        "XML value must be a string".into(),
                    ));
                }
            },
        };

        if payload.len() > self.max_size_bytes {
            return Err(CacheError::TooLarge(self.max_size_bytes));
        }

        let key = match element.key.as_deref() {
            Some(key) if !key.is_empty() => {
                if !self.key_write_authorized(secret) {
                    return Err(CacheError::UnauthorizedKey);
                }
                key.to_string()
            }
            _ => ids::generate(),
        };

        Ok(PreparedPut {
            key,
            record: record::frame(payload_type, &payload),
            ttl_seconds: effective_ttl(element.ttlseconds as u64, self.max_ttl_seconds),
        })
    }

    fn key_write_authorized(&self, secret: Option<&str>) -> bool {
        if !self.allow_keys {
            return false;
        }
        match (&self.api_key, secret) {
            (Some(expected), Some(provided)) => expected == provided,
            _ => false,
        }
    }
}

/// Apply the configured TTL cap; a cap of zero means unbounded.
fn effective_ttl(requested: u64, max_ttl_seconds: u64) -> u64 {
    if max_ttl_seconds > 0 {
        requested.min(max_ttl_seconds)
    } else {
        requested
    }
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Clone)]
pub struct CacheState {
    pub service: Arc<CacheService>,
}

/// Build the cache router.
pub fn routes(service: Arc<CacheService>) -> Router {
    Router::new()
        .route("/cache", get(get_cache).post(put_cache))
        .with_state(CacheState { service })
}

async fn put_cache(
    State(state): State<CacheState>,
    Query(query): Query<PutQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let service = &state.service;

    let secret = extract_secret(&headers, query.api_key.as_deref());
    let result = match serde_json::from_slice::<PutRequest>(&body) {
        Ok(request) => service.put_batch(request, secret.as_deref()).await,
        Err(e) => Err(CacheError::MalformedRequest(format!(
            "invalid request envelope: {e}"
        ))),
    };

    let outcome = match &result {
        Ok(_) => Outcome::Ok,
        Err(e) => Outcome::from_error(e),
    };
    service
        .metrics()
        .record_request(Op::Put, outcome, started.elapsed());

    match result {
        Ok(response) => Json(response).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

async fn get_cache(State(state): State<CacheState>, Query(query): Query<GetQuery>) -> Response {
    let started = Instant::now();
    let service = &state.service;

    let result = service.fetch(query.uuid.as_deref().unwrap_or("")).await;

    let outcome = match &result {
        Ok(_) => Outcome::Ok,
        Err(e) => Outcome::from_error(e),
    };
    service
        .metrics()
        .record_request(Op::Get, outcome, started.elapsed());

    match result {
        Ok((payload_type, payload)) => (
            [(header::CONTENT_TYPE, payload_type.content_type())],
            payload,
        )
            .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

/// The write secret may arrive in a header or as a query parameter.
fn extract_secret(headers: &HeaderMap, query_secret: Option<&str>) -> Option<String> {
    if let Some(value) = headers.get(WRITE_SECRET_HEADER) {
        if let Ok(value) = value.to_str() {
            return Some(value.to_string());
        }
    }
    query_secret.map(|s| s.to_string())
}
