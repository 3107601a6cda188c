//! Availability document store.
//!
//! [`AvailabilityStore`] is the seam between the core and the external
//! search engine: index/update/delete/search/get over availability
//! documents. [`RediSearchStore`] is the production backend (RediSearch over
//! JSON documents); [`MemoryStore`] evaluates the same canonical filter
//! clauses in-process for tests and local development.

pub mod schema;

mod decode;
mod memory;
mod redis;

pub use memory::MemoryStore;
pub use redis::RediSearchStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::TableAvailability;
use crate::query::NormalizedQuery;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("document not found")]
    NotFound,
    #[error("index backend error: {0}")]
    Backend(String),
    #[error("malformed engine response: {0}")]
    Decode(String),
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub results: Vec<TableAvailability>,
    pub total: usize,
    pub page: usize,
    pub size: usize,
    pub pages: usize,
}

impl SearchResult {
    /// Build a page, deriving the page count from the total.
    pub fn paged(results: Vec<TableAvailability>, total: usize, page: usize, size: usize) -> Self {
        let pages = if size == 0 { 0 } else { total.div_ceil(size) };
        Self {
            results,
            total,
            page,
            size,
            pages,
        }
    }

    /// A single-document result, as cached for get-by-id lookups.
    pub fn single(doc: TableAvailability) -> Self {
        Self {
            results: vec![doc],
            total: 1,
            page: 1,
            size: 1,
            pages: 1,
        }
    }
}

/// Index operations against the search engine.
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// Index a document (first write for its key).
    async fn index(&self, doc: &TableAvailability) -> Result<(), IndexError>;

    /// Update a document (recompute for an existing key). Both writes are
    /// full-document upserts, which is what makes sync replays idempotent.
    async fn update(&self, doc: &TableAvailability) -> Result<(), IndexError>;

    /// Delete a document by id.
    async fn delete(&self, id: &str) -> Result<(), IndexError>;

    /// Run a normalized query and return one result page.
    async fn search(&self, query: &NormalizedQuery) -> Result<SearchResult, IndexError>;

    /// Fetch a single document by id.
    async fn get_by_id(&self, id: &str) -> Result<TableAvailability, IndexError>;

    /// Total indexed documents (match-all probe).
    async fn count(&self) -> Result<usize, IndexError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TableAvailability;

    #[test]
    fn test_paged_derives_page_count() {
        let res = SearchResult::paged(vec![], 25, 1, 10);
        assert_eq!(res.pages, 3);

        let res = SearchResult::paged(vec![], 30, 1, 10);
        assert_eq!(res.pages, 3);

        let res = SearchResult::paged(vec![], 0, 1, 10);
        assert_eq!(res.pages, 0);
    }

    #[test]
    fn test_single_wraps_one_document() {
        let doc = TableAvailability::new(3, 4, "dinner", "2025-03-01");
        let res = SearchResult::single(doc.clone());
        assert_eq!(res.total, 1);
        assert_eq!(res.pages, 1);
        assert_eq!(res.results, vec![doc]);
    }
}
