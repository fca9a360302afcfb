//! Aerospike driver
//!
//! Records are written with a create-only policy, which makes the server
//! refuse a second write to the same key — the native form of put-if-absent.
//! Each record holds the framed value in a single bin. The client library is
//! synchronous, so calls run on the blocking thread pool.

use std::collections::HashMap;
use std::sync::Arc;

use aerospike::errors::{Error as AsError, ErrorKind};
use aerospike::{
    as_bin, as_key, Bins, Client, ClientPolicy, Expiration, ReadPolicy, RecordExistsAction,
    ResultCode, Value, WritePolicy,
};
use async_trait::async_trait;

use super::backend::Backend;
use super::error::CacheError;
use crate::core::config::AerospikeConfig;
use crate::core::constants::AEROSPIKE_BIN_NAME;

pub struct AerospikeBackend {
    client: Arc<Client>,
    namespace: String,
    set: String,
}

impl AerospikeBackend {
    pub async fn new(config: &AerospikeConfig) -> Result<Self, CacheError> {
        let hosts = config.hosts.join(",");
        let namespace = config.namespace.clone();
        let set = config.set.clone();

        // Cluster discovery blocks, keep it off the runtime threads
        let client = tokio::task::spawn_blocking(move || {
            Client::new(&ClientPolicy::default(), &hosts)
        })
        .await
        .map_err(|e| CacheError::PutInternal(e.to_string()))?
        .map_err(|e| CacheError::PutInternal(format!("Aerospike connect failed: {e}")))?;

        tracing::debug!(
            hosts = ?config.hosts,
            namespace = %namespace,
            set = %set,
            "Aerospike backend connected"
        );

        Ok(Self {
            client: Arc::new(client),
            namespace,
            set,
        })
    }
}

#[async_trait]
impl Backend for AerospikeBackend {
    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let client = Arc::clone(&self.client);
        let namespace = self.namespace.clone();
        let set = self.set.clone();
        let key = key.to_string();

        let result = tokio::task::spawn_blocking(move || {
            let record_key = as_key!(namespace, set, key.as_str());
            client.get(&ReadPolicy::default(), &record_key, Bins::All)
        })
        .await
        .map_err(|e| CacheError::GetInternal(e.to_string()))?;

        let record = match result {
            Ok(record) => record,
            Err(AsError(ErrorKind::ServerError(ResultCode::KeyNotFoundError), _)) => {
                return Err(CacheError::KeyNotFound);
            }
            Err(e) => return Err(CacheError::GetInternal(e.to_string())),
        };

        record_value(&record.bins)
    }

    async fn put(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<(), CacheError> {
        let client = Arc::clone(&self.client);
        let namespace = self.namespace.clone();
        let set = self.set.clone();
        let key = key.to_string();
        let value = value.to_vec();

        let result = tokio::task::spawn_blocking(move || {
            let mut policy = WritePolicy::default();
            policy.record_exists_action = RecordExistsAction::CreateOnly;
            policy.expiration = write_expiration(ttl_seconds);

            let record_key = as_key!(namespace, set, key.as_str());
            let bin = as_bin!(AEROSPIKE_BIN_NAME, value);
            client.put(&policy, &record_key, &[bin])
        })
        .await
        .map_err(|e| CacheError::PutInternal(e.to_string()))?;

        match result {
            Ok(()) => Ok(()),
            Err(AsError(ErrorKind::ServerError(ResultCode::KeyExistsError), _)) => {
                Err(CacheError::RecordExists)
            }
            Err(e) => Err(CacheError::PutInternal(e.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "aerospike"
    }
}

/// TTL to record expiration; zero defers to the namespace default.
fn write_expiration(ttl_seconds: u64) -> Expiration {
    if ttl_seconds > 0 {
        Expiration::Seconds(u32::try_from(ttl_seconds).unwrap_or(u32::MAX))
    } else {
        Expiration::NamespaceDefault
    }
}

/// Pull the framed record out of the single value bin.
fn record_value(bins: &HashMap<String, Value>) -> Result<Vec<u8>, CacheError> {
    match bins.get(AEROSPIKE_BIN_NAME) {
        Some(Value::Blob(bytes)) => Ok(bytes.clone()),
        Some(Value::String(s)) => Ok(s.clone().into_bytes()),
        Some(other) => Err(CacheError::GetInternal(format!(
            "unexpected bin type: {other}"
        ))),
        None => Err(CacheError::GetInternal("record has no value bin".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_expiration_uses_requested_seconds() {
        assert!(matches!(write_expiration(60), Expiration::Seconds(60)));
        assert!(matches!(write_expiration(1), Expiration::Seconds(1)));
    }

    #[test]
    fn test_write_expiration_zero_is_namespace_default() {
        assert!(matches!(write_expiration(0), Expiration::NamespaceDefault));
    }

    #[test]
    fn test_write_expiration_saturates_oversized_ttl() {
        assert!(matches!(
            write_expiration(u64::MAX),
            Expiration::Seconds(u32::MAX)
        ));
    }

    #[test]
    fn test_record_value_from_blob_bin() {
        let mut bins = HashMap::new();
        bins.insert(
            AEROSPIKE_BIN_NAME.to_string(),
            Value::Blob(b"\x00{}".to_vec()),
        );
        assert_eq!(record_value(&bins).unwrap(), b"\x00{}".to_vec());
    }

    #[test]
    fn test_record_value_from_string_bin() {
        let mut bins = HashMap::new();
        bins.insert(
            AEROSPIKE_BIN_NAME.to_string(),
            Value::String("\u{1}<x/>".to_string()),
        );
        assert_eq!(record_value(&bins).unwrap(), b"\x01<x/>".to_vec());
    }

    #[test]
    fn test_record_value_rejects_other_bin_types() {
        let mut bins = HashMap::new();
        bins.insert(AEROSPIKE_BIN_NAME.to_string(), Value::Int(7));
        assert!(matches!(
            record_value(&bins),
            Err(CacheError::GetInternal(_))
        ));
    }

    #[test]
    fn test_record_value_requires_value_bin() {
        let bins = HashMap::new();
        assert!(matches!(
            record_value(&bins),
            Err(CacheError::GetInternal(_))
        ));
    }
}
