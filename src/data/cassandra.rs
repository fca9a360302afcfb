//! Cassandra driver
//!
//! Put-if-absent rides on a lightweight transaction: `INSERT ... IF NOT
//! EXISTS USING TTL ?`. The LWT result row carries an `[applied]` boolean in
//! its first column; false means the key was already bound. An empty SELECT
//! result is a missing key.

use async_trait::async_trait;
use scylla::{Session, SessionBuilder};

use super::backend::Backend;
use super::error::CacheError;
use crate::core::config::CassandraConfig;

pub struct CassandraBackend {
    session: Session,
    select_stmt: String,
    insert_stmt: String,
}

impl CassandraBackend {
    pub async fn new(config: &CassandraConfig) -> Result<Self, CacheError> {
        let session = SessionBuilder::new()
            .known_nodes(&config.hosts)
            .build()
            .await
            .map_err(|e| CacheError::PutInternal(format!("Cassandra connect failed: {e}")))?;

        tracing::debug!(
            hosts = ?config.hosts,
            keyspace = %config.keyspace,
            table = %config.table,
            "Cassandra backend connected"
        );

        Ok(Self {
            session,
            select_stmt: select_statement(&config.keyspace, &config.table),
            insert_stmt: insert_statement(&config.keyspace, &config.table),
        })
    }
}

fn select_statement(keyspace: &str, table: &str) -> String {
    format!("SELECT value FROM {keyspace}.{table} WHERE key = ?")
}

fn insert_statement(keyspace: &str, table: &str) -> String {
    format!("INSERT INTO {keyspace}.{table} (key, value) VALUES (?, ?) IF NOT EXISTS USING TTL ?")
}

#[async_trait]
impl Backend for CassandraBackend {
    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let result = self
            .session
            .query(self.select_stmt.clone(), (key,))
            .await
            .map_err(|e| CacheError::GetInternal(e.to_string()))?;

        match result.maybe_first_row_typed::<(Vec<u8>,)>() {
            Ok(Some((value,))) => Ok(value),
            Ok(None) => Err(CacheError::KeyNotFound),
            Err(e) => Err(CacheError::GetInternal(e.to_string())),
        }
    }

    async fn put(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<(), CacheError> {
        // USING TTL 0 stores without expiry, which doubles as the backend
        // default for this driver
        let ttl = i32::try_from(ttl_seconds).unwrap_or(i32::MAX);

        let result = self
            .session
            .query(self.insert_stmt.clone(), (key, value.to_vec(), ttl))
            .await
            .map_err(|e| CacheError::PutInternal(e.to_string()))?;

        let row = result
            .first_row()
            .map_err(|e| CacheError::PutInternal(e.to_string()))?;

        let applied = row
            .columns
            .first()
            .and_then(|column| column.as_ref())
            .and_then(|value| value.as_boolean())
            .unwrap_or(false);

        if applied {
            Ok(())
        } else {
            Err(CacheError::RecordExists)
        }
    }

    fn name(&self) -> &'static str {
        "cassandra"
    }
}
