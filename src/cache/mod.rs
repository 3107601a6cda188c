// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Hybrid two-tier read-through cache.
//!
//! # Tiers
//!
//! - **Local**: short-TTL in-process map, the authoritative fast path.
//! - **Distributed** (optional): longer-TTL shared Redis keyspace,
//!   consulted on local miss; hits are promoted back into the local tier.
//!
//! The distributed tier is best-effort end to end: connection loss, command
//! errors, and codec decode failures all degrade to a miss. `clear()` only
//! empties the local tier - distributed entries age out through their own
//! TTL - which bounds invalidation cost to the local map size.
//!
//! The cache is an explicitly constructed, injectable object (no global
//! state); tests build isolated instances per case.

mod codec;
mod distributed;
mod local;

pub use codec::{CacheCodec, CodecError, JsonCodec};
pub use distributed::DistributedCache;
pub use local::LocalCache;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Cache counters surfaced through the stats endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub local_entries: usize,
    pub distributed_hits: u64,
    pub distributed_misses: u64,
}

pub struct HybridCache<V> {
    local: LocalCache<V>,
    distributed: Option<DistributedCache>,
    codec: Box<dyn CacheCodec<V>>,
    distributed_hits: AtomicU64,
    distributed_misses: AtomicU64,
}

impl<V: Clone + Send + Sync> HybridCache<V> {
    /// Build a cache with an optional distributed tier. Passing `None`
    /// degrades to local-only caching with no error.
    pub fn new(
        local_ttl: Duration,
        distributed: Option<DistributedCache>,
        codec: Box<dyn CacheCodec<V>>,
    ) -> Self {
        Self {
            local: LocalCache::new(local_ttl),
            distributed,
            codec,
            distributed_hits: AtomicU64::new(0),
            distributed_misses: AtomicU64::new(0),
        }
    }

    /// Read through both tiers. A distributed hit repopulates the local
    /// tier; a distributed decode failure counts as a miss.
    pub async fn get(&self, key: &str) -> Option<V> {
        if let Some(value) = self.local.get(key) {
            return Some(value);
        }

        let distributed = self.distributed.as_ref()?;
        let Some(bytes) = distributed.get(key).await else {
            self.distributed_misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        match self.codec.decode(&bytes) {
            Ok(value) => {
                self.distributed_hits.fetch_add(1, Ordering::Relaxed);
                self.local.set(key, value.clone());
                Some(value)
            }
            Err(e) => {
                debug!(key = %key, error = %e, "distributed cache entry undecodable");
                self.distributed_misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Write-through to both tiers.
    pub async fn set(&self, key: &str, value: &V) {
        self.local.set(key, value.clone());
        if let Some(distributed) = &self.distributed {
            match self.codec.encode(value) {
                Ok(bytes) => distributed.set(key, bytes).await,
                Err(e) => debug!(key = %key, error = %e, "cache value not encodable"),
            }
        }
    }

    /// Remove a key from both tiers.
    pub async fn delete(&self, key: &str) {
        self.local.delete(key);
        if let Some(distributed) = &self.distributed {
            distributed.delete(key).await;
        }
    }

    /// Wholesale invalidation: empties the local tier only; distributed
    /// entries expire through their own TTL.
    pub fn clear(&self) {
        self.local.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            local_entries: self.local.len(),
            distributed_hits: self.distributed_hits.load(Ordering::Relaxed),
            distributed_misses: self.distributed_misses.load(Ordering::Relaxed),
        }
    }
}
