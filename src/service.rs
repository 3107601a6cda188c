// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search service.
//!
//! Read-path orchestration: normalize the query, try the hybrid cache under
//! the normalized query's hash, fall through to the document store, and
//! populate the cache on the way back. Get-by-id follows the same shape
//! under an id-scoped key.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::cache::{CacheStats, HybridCache};
use crate::domain::TableAvailability;
use crate::index::{AvailabilityStore, IndexError, SearchResult};
use crate::metrics;
use crate::query::{normalize, SearchQuery};
use crate::reindex::ReindexOutcome;

/// Service counters and index state surfaced at `/search/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub documents: usize,
    pub cache: CacheStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reindex: Option<ReindexOutcome>,
}

pub struct SearchService {
    store: Arc<dyn AvailabilityStore>,
    cache: Arc<HybridCache<SearchResult>>,
    reindex_status: Arc<RwLock<Option<ReindexOutcome>>>,
}

impl SearchService {
    pub fn new(
        store: Arc<dyn AvailabilityStore>,
        cache: Arc<HybridCache<SearchResult>>,
        reindex_status: Arc<RwLock<Option<ReindexOutcome>>>,
    ) -> Self {
        Self {
            store,
            cache,
            reindex_status,
        }
    }

    /// Answer a search, consulting the cache under the normalized query's
    /// stable key.
    pub async fn search(&self, raw: &SearchQuery) -> Result<SearchResult, IndexError> {
        let start = Instant::now();
        let normalized = normalize(raw);
        let key = normalized.cache_key();

        if let Some(result) = self.cache.get(&key).await {
            debug!(key = %key, "Search cache hit");
            metrics::record_search_cache(true);
            metrics::record_search_latency("cache", start.elapsed());
            return Ok(result);
        }
        metrics::record_search_cache(false);

        let result = self.store.search(&normalized).await;
        match &result {
            Ok(page) => {
                metrics::record_search_query("engine", "success");
                metrics::record_search_latency("engine", start.elapsed());
                self.cache.set(&key, page).await;
            }
            Err(_) => metrics::record_search_query("engine", "error"),
        }
        result
    }

    /// Fetch one document, id-scoped cache first.
    pub async fn get_by_id(&self, id: &str) -> Result<TableAvailability, IndexError> {
        let key = doc_cache_key(id);
        if let Some(cached) = self.cache.get(&key).await {
            if let Some(doc) = cached.results.first() {
                metrics::record_search_cache(true);
                return Ok(doc.clone());
            }
        }
        metrics::record_search_cache(false);

        let doc = self.store.get_by_id(id).await?;
        self.cache.set(&key, &SearchResult::single(doc.clone())).await;
        Ok(doc)
    }

    /// Document count (match-all probe) plus cache and reindex state.
    pub async fn stats(&self) -> Result<Stats, IndexError> {
        let documents = self.store.count().await?;
        metrics::set_document_count(documents);
        Ok(Stats {
            documents,
            cache: self.cache.stats(),
            last_reindex: self.reindex_status.read().clone(),
        })
    }

    /// Cache counters only; usable even when the engine is unreachable.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Wholesale cache invalidation.
    pub fn invalidate_all(&self) {
        self.cache.clear();
    }

    /// Raw cache lookup backing the introspection endpoint.
    pub async fn cache_value(&self, key: &str) -> Option<SearchResult> {
        self.cache.get(key).await
    }
}

fn doc_cache_key(id: &str) -> String {
    format!("doc:{id}")
}
