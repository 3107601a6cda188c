//! In-memory document store.
//!
//! Backs tests and local development without a running engine. Search
//! evaluates the canonical filter clauses produced by the normalizer
//! (tag equality and numeric ranges); free-text matching is left to the
//! real engine, so a non-match-all text query is treated as match-all here.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::TableAvailability;
use crate::query::{NormalizedQuery, SortOrder};

use super::schema::{
    FIELD_CAPACITY, FIELD_CREATED_AT, FIELD_DATE, FIELD_DATE_TS, FIELD_IS_AVAILABLE,
    FIELD_MEAL_TYPE, FIELD_TABLE_NUMBER, FIELD_UPDATED_AT,
};
use super::{AvailabilityStore, IndexError, SearchResult};

#[derive(Default)]
pub struct MemoryStore {
    docs: DashMap<String, TableAvailability>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            docs: DashMap::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn clear(&self) {
        self.docs.clear();
    }
}

#[async_trait]
impl AvailabilityStore for MemoryStore {
    async fn index(&self, doc: &TableAvailability) -> Result<(), IndexError> {
        self.docs.insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn update(&self, doc: &TableAvailability) -> Result<(), IndexError> {
        self.docs.insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), IndexError> {
        self.docs.remove(id);
        Ok(())
    }

    async fn search(&self, query: &NormalizedQuery) -> Result<SearchResult, IndexError> {
        let mut matches: Vec<TableAvailability> = self
            .docs
            .iter()
            .filter(|entry| matches_filters(entry.value(), query))
            .map(|entry| entry.value().clone())
            .collect();

        sort_documents(&mut matches, query);

        let total = matches.len();
        let start = query
            .page
            .saturating_sub(1)
            .saturating_mul(query.size)
            .min(total);
        let end = (start + query.size).min(total);
        let page = matches[start..end].to_vec();

        Ok(SearchResult::paged(page, total, query.page, query.size))
    }

    async fn get_by_id(&self, id: &str) -> Result<TableAvailability, IndexError> {
        self.docs
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or(IndexError::NotFound)
    }

    async fn count(&self) -> Result<usize, IndexError> {
        Ok(self.docs.len())
    }
}

fn matches_filters(doc: &TableAvailability, query: &NormalizedQuery) -> bool {
    query.filters.iter().all(|(field, clause)| {
        match parse_clause(clause) {
            Some(Clause::Tag(value)) => match field.as_str() {
                FIELD_MEAL_TYPE => doc.meal_type == value,
                FIELD_DATE => doc.date == value,
                FIELD_IS_AVAILABLE => doc.is_available.to_string() == value,
                // Unknown tag fields are not indexed here; don't filter on them.
                _ => true,
            },
            Some(Clause::Range(range)) => match field.as_str() {
                FIELD_CAPACITY => range.contains(doc.capacity as f64),
                FIELD_TABLE_NUMBER => range.contains(doc.table_number as f64),
                FIELD_DATE_TS => range.contains(doc.date_ts as f64),
                _ => true,
            },
            None => true,
        }
    })
}

fn sort_documents(docs: &mut [TableAvailability], query: &NormalizedQuery) {
    let Some(sort) = &query.sort else {
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        return;
    };

    docs.sort_by(|a, b| {
        let ordering = match sort.field.as_str() {
            FIELD_DATE => a.date.cmp(&b.date),
            FIELD_DATE_TS => a.date_ts.cmp(&b.date_ts),
            FIELD_TABLE_NUMBER => a.table_number.cmp(&b.table_number),
            FIELD_CAPACITY => a.capacity.cmp(&b.capacity),
            FIELD_CREATED_AT => a.created_at.cmp(&b.created_at),
            FIELD_UPDATED_AT => a.updated_at.cmp(&b.updated_at),
            _ => a.id.cmp(&b.id),
        };
        match sort.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

enum Clause {
    Tag(String),
    Range(Range),
}

struct Range {
    min: f64,
    min_exclusive: bool,
    max: f64,
    max_exclusive: bool,
}

impl Range {
    fn contains(&self, value: f64) -> bool {
        let above = if self.min_exclusive {
            value > self.min
        } else {
            value >= self.min
        };
        let below = if self.max_exclusive {
            value < self.max
        } else {
            value <= self.max
        };
        above && below
    }
}

/// Parse a canonical clause body: `{tag}` or `[min max]` with optional
/// `(`-exclusive bounds and `-inf`/`+inf`.
fn parse_clause(clause: &str) -> Option<Clause> {
    if let Some(tag) = clause.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        return Some(Clause::Tag(tag.replace('\\', "")));
    }

    let body = clause.strip_prefix('[').and_then(|s| s.strip_suffix(']'))?;
    let mut parts = body.split_whitespace();
    let (min, min_exclusive) = parse_bound(parts.next()?, f64::NEG_INFINITY)?;
    let (max, max_exclusive) = parse_bound(parts.next()?, f64::INFINITY)?;
    Some(Clause::Range(Range {
        min,
        min_exclusive,
        max,
        max_exclusive,
    }))
}

fn parse_bound(raw: &str, infinity: f64) -> Option<(f64, bool)> {
    let (raw, exclusive) = match raw.strip_prefix('(') {
        Some(rest) => (rest, true),
        None => (raw, false),
    };
    match raw {
        "-inf" | "+inf" | "inf" => Some((infinity, exclusive)),
        _ => raw.parse().ok().map(|v| (v, exclusive)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{normalize, SearchQuery};
    use std::collections::HashMap;

    fn store_with_docs() -> MemoryStore {
        let store = MemoryStore::new();
        let docs = [
            TableAvailability::new(3, 4, "dinner", "2025-03-01").occupied("R1"),
            TableAvailability::new(5, 6, "dinner", "2025-03-01"),
            TableAvailability::new(1, 2, "lunch", "2025-03-02"),
        ];
        for doc in docs {
            store.docs.insert(doc.id.clone(), doc);
        }
        store
    }

    fn query(filters: &[(&str, &str)]) -> NormalizedQuery {
        normalize(&SearchQuery {
            filters: filters
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_search_by_meal_and_date() {
        let store = store_with_docs();
        let res = store
            .search(&query(&[("meal_type", "dinner"), ("date", "2025-03-01")]))
            .await
            .unwrap();
        assert_eq!(res.total, 2);
        assert!(res.results.iter().all(|d| d.meal_type == "dinner"));
    }

    #[tokio::test]
    async fn test_search_by_availability() {
        let store = store_with_docs();
        let res = store
            .search(&query(&[("is_available", "false")]))
            .await
            .unwrap();
        assert_eq!(res.total, 1);
        assert_eq!(res.results[0].reservation_id.as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn test_search_by_capacity_is_min_bound() {
        let store = store_with_docs();
        let res = store.search(&query(&[("capacity", "4")])).await.unwrap();
        assert_eq!(res.total, 2);
        assert!(res.results.iter().all(|d| d.capacity >= 4));
    }

    #[tokio::test]
    async fn test_match_all_returns_everything_sorted_by_id() {
        let store = store_with_docs();
        let res = store.search(&query(&[])).await.unwrap();
        assert_eq!(res.total, 3);
        let ids: Vec<&str> = res.results.iter().map(|d| d.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[tokio::test]
    async fn test_sort_and_pagination() {
        let store = store_with_docs();
        let mut raw = SearchQuery {
            page: 1,
            size: 2,
            sort: "capacity".into(),
            order: "desc".into(),
            filters: HashMap::new(),
            ..Default::default()
        };
        let res = store.search(&normalize(&raw)).await.unwrap();
        assert_eq!(res.total, 3);
        assert_eq!(res.pages, 2);
        assert_eq!(res.results.len(), 2);
        assert_eq!(res.results[0].capacity, 6);

        raw.page = 2;
        let res = store.search(&normalize(&raw)).await.unwrap();
        assert_eq!(res.results.len(), 1);
        assert_eq!(res.results[0].capacity, 2);
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let store = store_with_docs();
        let doc = store.get_by_id("table-dinner-3-2025-03-01").await.unwrap();
        assert_eq!(doc.table_number, 3);

        assert!(matches!(
            store.get_by_id("table-dinner-9-2099-01-01").await,
            Err(IndexError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_overwrites() {
        let store = store_with_docs();
        let doc = store
            .get_by_id("table-dinner-3-2025-03-01")
            .await
            .unwrap()
            .released();
        store.update(&doc).await.unwrap();

        let fetched = store.get_by_id("table-dinner-3-2025-03-01").await.unwrap();
        assert!(fetched.is_available);
        assert!(fetched.reservation_id.is_none());
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = store_with_docs();
        store.delete("table-dinner-3-2025-03-01").await.unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.get_by_id("table-dinner-3-2025-03-01").await.is_err());
    }

    #[test]
    fn test_parse_clause_ranges() {
        let Some(Clause::Range(r)) = parse_clause("[4 +inf]") else {
            panic!("expected range");
        };
        assert!(r.contains(4.0));
        assert!(r.contains(100.0));
        assert!(!r.contains(3.9));

        let Some(Clause::Range(r)) = parse_clause("[1740787200 (1740873600]") else {
            panic!("expected range");
        };
        assert!(r.contains(1740787200.0));
        assert!(r.contains(1740873599.0));
        assert!(!r.contains(1740873600.0));
    }

    #[test]
    fn test_parse_clause_tag_unescapes() {
        let Some(Clause::Tag(tag)) = parse_clause("{2025\\-03\\-01}") else {
            panic!("expected tag");
        };
        assert_eq!(tag, "2025-03-01");
    }
}
