//! Apache Ignite driver over the REST API
//!
//! Talks to the Ignite HTTP command endpoint
//! (`{scheme}://{host}:{port}/ignite?cacheName={name}`). Put-if-absent maps
//! to `cmd=putifabs`; the wire takes expiry in milliseconds while the rest of
//! the service speaks seconds, so the conversion lives here. Every reply is
//! the same JSON envelope: `{error, response, successStatus}` where
//! `successStatus == 0` and an empty `error` mean success. A successful get
//! with an empty `response` is a missing key.
//!
//! `insecure_tls` disables certificate verification for deployments fronting
//! Ignite with self-signed certificates. It is never the default.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use super::backend::Backend;
use super::error::CacheError;
use crate::core::config::IgniteConfig;
use crate::core::constants::{DRIVER_RETRY_BASE_DELAY_MS, DRIVER_RETRY_MAX_ATTEMPTS};
use crate::utils::retry;

pub struct IgniteBackend {
    client: reqwest::Client,
    base_url: Url,
}

/// Envelope for `cmd=get` replies
#[derive(Debug, Deserialize)]
struct GetEnvelope {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    response: Option<String>,
    #[serde(rename = "successStatus")]
    status: i64,
}

/// Envelope for `cmd=putifabs` replies; `response` reports whether the entry
/// was created
#[derive(Debug, Deserialize)]
struct PutEnvelope {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    response: bool,
    #[serde(rename = "successStatus")]
    status: i64,
}

/// Envelope for `cmd=getorcreate` replies
#[derive(Debug, Deserialize)]
struct CreateEnvelope {
    #[serde(default)]
    error: Option<String>,
    #[serde(rename = "successStatus")]
    status: i64,
}

impl IgniteBackend {
    pub async fn new(config: &IgniteConfig) -> Result<Self, CacheError> {
        let base_url = build_base_url(config)
            .map_err(|e| CacheError::PutInternal(format!("invalid Ignite endpoint: {e}")))?;

        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(5));
        if config.insecure_tls {
            tracing::warn!("Ignite TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder
            .build()
            .map_err(|e| CacheError::PutInternal(e.to_string()))?;

        let backend = Self { client, base_url };

        if config.create_on_start {
            backend.create_cache().await?;
        }

        tracing::info!(cache = %config.cache_name, "Ignite backend ready");
        Ok(backend)
    }

    /// Ensure the cache namespace exists via `cmd=getorcreate`.
    async fn create_cache(&self) -> Result<(), CacheError> {
        let url = self.command_url("getorcreate", &[]);
        let body = self.execute(url).await.map_err(CacheError::PutInternal)?;

        let envelope: CreateEnvelope = serde_json::from_slice(&body)
            .map_err(|e| CacheError::PutInternal(format!("unmarshal response error: {e}")))?;

        match envelope_error(envelope.error, envelope.status) {
            Some(reason) => Err(CacheError::PutInternal(reason)),
            None => Ok(()),
        }
    }

    fn command_url(&self, cmd: &str, pairs: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("cmd", cmd);
            for (name, value) in pairs {
                query.append_pair(name, value);
            }
        }
        url
    }

    async fn execute(&self, url: Url) -> Result<Vec<u8>, String> {
        let response = retry::with_backoff(
            DRIVER_RETRY_MAX_ATTEMPTS,
            DRIVER_RETRY_BASE_DELAY_MS,
            |e: &reqwest::Error| e.is_connect() || e.is_timeout(),
            || self.client.get(url.clone()).send(),
        )
        .await
        .map_err(|e| format!("Ignite request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("Ignite error. Unexpected status code: {status}"));
        }

        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|e| format!("Ignite body read failed: {e}"))
    }
}

#[async_trait]
impl Backend for IgniteBackend {
    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let url = self.command_url("get", &[("key", key)]);
        let body = self.execute(url).await.map_err(CacheError::GetInternal)?;

        let envelope: GetEnvelope = serde_json::from_slice(&body)
            .map_err(|e| CacheError::GetInternal(format!("unmarshal response error: {e}")))?;

        if let Some(reason) = envelope_error(envelope.error, envelope.status) {
            return Err(CacheError::GetInternal(reason));
        }

        // No error and status zero, but nothing in `response`: the key is
        // unknown or expired
        match envelope.response {
            Some(value) if !value.is_empty() => Ok(value.into_bytes()),
            _ => Err(CacheError::KeyNotFound),
        }
    }

    async fn put(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<(), CacheError> {
        let value = std::str::from_utf8(value)
            .map_err(|_| CacheError::PutInternal("record is not valid UTF-8".into()))?;

        let ttl_millis;
        let mut pairs = vec![("key", key), ("val", value)];
        if ttl_seconds > 0 {
            ttl_millis = (ttl_seconds * 1_000).to_string();
            pairs.push(("exp", &ttl_millis));
        }

        let url = self.command_url("putifabs", &pairs);
        let body = self.execute(url).await.map_err(CacheError::PutInternal)?;

        let envelope: PutEnvelope = serde_json::from_slice(&body)
            .map_err(|e| CacheError::PutInternal(format!("unmarshal response error: {e}")))?;

        if let Some(reason) = envelope_error(envelope.error, envelope.status) {
            return Err(CacheError::PutInternal(reason));
        }

        if !envelope.response {
            return Err(CacheError::RecordExists);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "ignite"
    }
}

/// Server-side failure reason, if the envelope reports one.
fn envelope_error(error: Option<String>, status: i64) -> Option<String> {
    match error {
        Some(message) if !message.is_empty() => Some(message),
        _ if status != 0 => Some("Ignite successStatus not zero".to_string()),
        _ => None,
    }
}

fn build_base_url(config: &IgniteConfig) -> Result<Url, String> {
    let mut url = Url::parse(&format!(
        "{}://{}:{}/ignite",
        config.scheme, config.host, config.port
    ))
    .map_err(|e| e.to_string())?;
    url.query_pairs_mut()
        .append_pair("cacheName", &config.cache_name);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> IgniteConfig {
        IgniteConfig {
            scheme: "http".into(),
            host: "ignite.internal".into(),
            port: 8080,
            cache_name: "auction".into(),
            create_on_start: false,
            insecure_tls: false,
        }
    }

    #[test]
    fn test_base_url_includes_cache_name() {
        let url = build_base_url(&test_config()).unwrap();
        assert_eq!(
            url.as_str(),
            "http://ignite.internal:8080/ignite?cacheName=auction"
        );
    }

    #[test]
    fn test_get_envelope_hit() {
        let envelope: GetEnvelope =
            serde_json::from_str("{\"error\":\"\",\"response\":\"\\u0000{}\",\"successStatus\":0}")
                .unwrap();
        assert_eq!(envelope_error(envelope.error, envelope.status), None);
        assert_eq!(envelope.response.unwrap().into_bytes(), b"\x00{}".to_vec());
    }

    #[test]
    fn test_get_envelope_miss_has_empty_response() {
        let envelope: GetEnvelope =
            serde_json::from_str(r#"{"error":"","response":"","successStatus":0}"#).unwrap();
        assert_eq!(envelope_error(envelope.error, envelope.status), None);
        assert_eq!(envelope.response.as_deref(), Some(""));
    }

    #[test]
    fn test_get_envelope_null_fields() {
        let envelope: GetEnvelope =
            serde_json::from_str(r#"{"error":null,"response":null,"successStatus":0}"#).unwrap();
        assert_eq!(envelope_error(envelope.error, envelope.status), None);
        assert!(envelope.response.is_none());
    }

    #[test]
    fn test_put_envelope_created() {
        let envelope: PutEnvelope =
            serde_json::from_str(r#"{"error":"","response":true,"successStatus":0}"#).unwrap();
        assert_eq!(envelope_error(envelope.error, envelope.status), None);
        assert!(envelope.response);
    }

    #[test]
    fn test_put_envelope_existing_key() {
        let envelope: PutEnvelope =
            serde_json::from_str(r#"{"error":"","response":false,"successStatus":0}"#).unwrap();
        assert_eq!(envelope_error(envelope.error, envelope.status), None);
        assert!(!envelope.response);
    }

    #[test]
    fn test_envelope_server_error() {
        assert_eq!(
            envelope_error(Some("cache is gone".into()), 1),
            Some("cache is gone".to_string())
        );
        assert_eq!(
            envelope_error(None, 1),
            Some("Ignite successStatus not zero".to_string())
        );
        assert_eq!(
            envelope_error(Some(String::new()), 2),
            Some("Ignite successStatus not zero".to_string())
        );
    }
}
