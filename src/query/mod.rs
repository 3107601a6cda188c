//! Search query types.
//!
//! [`SearchQuery`] is the raw, untrusted input from the HTTP surface.
//! [`NormalizedQuery`] is its engine-safe, canonical form: an escaped query
//! string, a sorted filter-clause map, and a sanitized sort. Normalization is
//! a pure function (see [`normalizer`]) and its output serializes
//! byte-identically for equal inputs, which is what makes
//! [`NormalizedQuery::cache_key`] stable.

pub mod normalizer;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use normalizer::normalize;

/// Raw search input: free text, paging, sort, and a raw filter map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub page: usize,
    pub size: usize,
    pub sort: String,
    pub order: String,
    pub filters: HashMap<String, String>,
}

/// Sort direction, ascending unless explicitly descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Canonical sort: an engine field name and a direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

/// Engine-safe, canonical form of a search query.
///
/// `filters` maps engine field names to ready-to-render clause bodies
/// (`{dinner}`, `[4 +inf]`, `[1740787200 (1740873600]`). A `BTreeMap` keeps
/// iteration order deterministic regardless of how the raw filter map was
/// built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedQuery {
    pub query: String,
    pub filters: BTreeMap<String, String>,
    pub sort: Option<Sort>,
    pub page: usize,
    pub size: usize,
}

impl NormalizedQuery {
    /// Stable cache key: SHA-256 over the canonical representation.
    pub fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_repr().as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    /// Full engine query: the text query AND every filter clause.
    pub fn engine_query(&self) -> String {
        if self.filters.is_empty() {
            return self.query.clone();
        }
        let clauses: Vec<String> = self
            .filters
            .iter()
            .map(|(field, clause)| format!("@{field}:{clause}"))
            .collect();
        if self.query == "*" {
            clauses.join(" ")
        } else {
            format!("{} {}", self.query, clauses.join(" "))
        }
    }

    fn canonical_repr(&self) -> String {
        let filters: Vec<String> = self
            .filters
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        let (sort, order) = match &self.sort {
            Some(s) => (s.field.as_str(), s.order.as_str()),
            None => ("", ""),
        };
        format!(
            "q={}|p={}|s={}|sort={}|order={}|f={}",
            self.query,
            self.page,
            self.size,
            sort,
            order,
            filters.join(",")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(query: &str, filters: &[(&str, &str)]) -> NormalizedQuery {
        NormalizedQuery {
            query: query.to_string(),
            filters: filters
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            sort: None,
            page: 1,
            size: 10,
        }
    }

    #[test]
    fn test_cache_key_is_stable() {
        let a = normalized("*", &[("meal_type", "{dinner}"), ("capacity", "[4 +inf]")]);
        let b = normalized("*", &[("capacity", "[4 +inf]"), ("meal_type", "{dinner}")]);
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key().len(), 64);
    }

    #[test]
    fn test_cache_key_distinguishes_queries() {
        let a = normalized("*", &[("meal_type", "{dinner}")]);
        let b = normalized("*", &[("meal_type", "{lunch}")]);
        assert_ne!(a.cache_key(), b.cache_key());

        let c = NormalizedQuery {
            page: 2,
            ..a.clone()
        };
        assert_ne!(a.cache_key(), c.cache_key());
    }

    #[test]
    fn test_engine_query_match_all_with_filters_drops_star() {
        let q = normalized("*", &[("meal_type", "{dinner}")]);
        assert_eq!(q.engine_query(), "@meal_type:{dinner}");
    }

    #[test]
    fn test_engine_query_appends_sorted_filters() {
        let q = normalized(
            "(@id:*r1*)",
            &[("meal_type", "{dinner}"), ("capacity", "[4 +inf]")],
        );
        assert_eq!(
            q.engine_query(),
            "(@id:*r1*) @capacity:[4 +inf] @meal_type:{dinner}"
        );
    }

    #[test]
    fn test_engine_query_without_filters() {
        let q = normalized("*", &[]);
        assert_eq!(q.engine_query(), "*");
    }
}
