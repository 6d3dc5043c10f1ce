//! TTL cache for search pages, upstream failures and salary estimates.
//!
//! Values are JSON strings so Redis and the in-memory map share one contract.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::warn;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[async_trait]
pub trait SearchCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
}

/// Reads and decodes a cached value. Backend failures and undecodable
/// entries are logged and treated as a miss.
pub async fn get_json<T: DeserializeOwned>(cache: &dyn SearchCache, key: &str) -> Option<T> {
    let raw = match cache.get(key).await {
        Ok(raw) => raw?,
        Err(e) => {
            warn!(key, "Cache read failed: {e}");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, "Discarding undecodable cache entry: {e}");
            None
        }
    }
}

/// Encodes and stores a value; failures are logged, never propagated.
pub async fn put_json<T: Serialize + Sync>(cache: &dyn SearchCache, key: &str, value: &T, ttl: Duration) {
    let result = match serde_json::to_string(value) {
        Ok(raw) => cache.put(key, raw, ttl).await,
        Err(e) => Err(CacheError::from(e)),
    };
    if let Err(e) = result {
        warn!(key, "Cache write failed: {e}");
    }
}

/// Process-local cache used when no Redis URL is configured.
#[derive(Default)]
pub struct MemorySearchCache {
    entries: RwLock<HashMap<String, (Instant, String)>>,
}

impl MemorySearchCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SearchCache for MemorySearchCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|(expires_at, _)| Instant::now() < *expires_at)
            .map(|(_, value)| value.clone()))
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, (expires_at, _)| now < *expires_at);
        entries.insert(key.to_string(), (now + ttl, value));
        Ok(())
    }
}

/// Redis-backed cache. The connection manager is shared by every call and
/// reconnects on its own after a dropped connection.
#[derive(Clone)]
pub struct RedisSearchCache {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisSearchCache {
    pub async fn connect(client: redis::Client) -> Result<Self, CacheError> {
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::with_connection(conn))
    }

    pub fn with_connection(conn: ConnectionManager) -> Self {
        Self {
            conn,
            prefix: KEY_PREFIX.to_string(),
        }
    }

    fn key(&self, key: &str) -> String {
        prefixed(&self.prefix, key)
    }
}

const KEY_PREFIX: &str = "seeker:";

fn prefixed(prefix: &str, key: &str) -> String {
    format!("{prefix}{key}")
}

#[async_trait]
impl SearchCache for RedisSearchCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(self.key(key)).await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(self.key(key), value, ttl.as_secs().max(1))
            .await?;
        Ok(())
    }
}
