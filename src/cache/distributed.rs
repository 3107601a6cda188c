//! Distributed cache tier.
//!
//! A shared Redis keyspace under a `cache:` prefix with per-entry TTL.
//! This tier is strictly best-effort: every error path degrades to a miss
//! for reads and a no-op for writes, so a down cache backend never surfaces
//! to callers.

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::debug;

use crate::resilience::retry::{retry, RetryConfig};

use super::CacheError;

pub struct DistributedCache {
    connection: ConnectionManager,
    ttl: Duration,
    prefix: String,
}

impl DistributedCache {
    /// Connect to the shared cache backend. Fails after the startup retry
    /// ceiling; callers treat a failure as "run local-only".
    pub async fn connect(url: &str, ttl: Duration, prefix: &str) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(|e| CacheError::Backend(e.to_string()))?;

        let connection = retry("cache_connect", &RetryConfig::startup(), || async {
            ConnectionManager::new(client.clone()).await
        })
        .await
        .map_err(|e: redis::RedisError| CacheError::Backend(e.to_string()))?;

        Ok(Self {
            connection,
            ttl,
            prefix: prefix.to_string(),
        })
    }

    fn cache_key(&self, key: &str) -> String {
        format!("{}cache:{}", self.prefix, key)
    }

    /// Fetch raw bytes. Any backend error reads as a miss.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut conn = self.connection.clone();
        let key = self.cache_key(key);
        match conn.get::<_, Option<Vec<u8>>>(&key).await {
            Ok(value) => value,
            Err(e) => {
                debug!(key = %key, error = %e, "distributed cache get failed");
                None
            }
        }
    }

    /// Write-through with the tier's TTL. Errors are logged and dropped.
    pub async fn set(&self, key: &str, value: Vec<u8>) {
        let mut conn = self.connection.clone();
        let key = self.cache_key(key);
        if let Err(e) = conn
            .set_ex::<_, _, ()>(&key, value, self.ttl.as_secs())
            .await
        {
            debug!(key = %key, error = %e, "distributed cache set failed");
        }
    }

    pub async fn delete(&self, key: &str) {
        let mut conn = self.connection.clone();
        let key = self.cache_key(key);
        if let Err(e) = conn.del::<_, ()>(&key).await {
            debug!(key = %key, error = %e, "distributed cache delete failed");
        }
    }
}
