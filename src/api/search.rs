//! Search handlers.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::domain::TableAvailability;
use crate::index::SearchResult;
use crate::query::SearchQuery;
use crate::reindex;
use crate::service::Stats;

use super::error::ApiError;
use super::AppState;

/// Query parameters consumed directly; everything else becomes a filter.
const RESERVED_PARAMS: [&str; 5] = ["q", "page", "size", "sort", "order"];

pub async fn query(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<SearchResult>, ApiError> {
    let raw = query_from_params(&params);
    let result = state.service.search(&raw).await?;
    Ok(Json(result))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TableAvailability>, ApiError> {
    let doc = state.service.get_by_id(&id).await?;
    Ok(Json(doc))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<Stats>, ApiError> {
    let stats = state.service.stats().await?;
    Ok(Json(stats))
}

/// Fire-and-forget rebuild; progress is observable via `/search/stats`.
pub async fn reindex(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    reindex::spawn_supervised(state.reindexer.clone(), state.reindex_deadline);
    (
        StatusCode::ACCEPTED,
        Json(json!({ "status": "reindex started" })),
    )
}

fn query_from_params(params: &HashMap<String, String>) -> SearchQuery {
    let numeric = |key: &str| {
        params
            .get(key)
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or_default()
    };

    SearchQuery {
        q: params.get("q").cloned().unwrap_or_default(),
        page: numeric("page"),
        size: numeric("size"),
        sort: params.get("sort").cloned().unwrap_or_default(),
        order: params.get("order").cloned().unwrap_or_default(),
        filters: params
            .iter()
            .filter(|(key, _)| !RESERVED_PARAMS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_query_from_params_splits_filters() {
        let raw = query_from_params(&params(&[
            ("q", "dinner"),
            ("page", "2"),
            ("size", "20"),
            ("sort", "date"),
            ("order", "desc"),
            ("meal_type", "dinner"),
            ("is_available", "true"),
            ("zone", "patio"),
        ]));

        assert_eq!(raw.q, "dinner");
        assert_eq!(raw.page, 2);
        assert_eq!(raw.size, 20);
        assert_eq!(raw.sort, "date");
        assert_eq!(raw.order, "desc");
        assert_eq!(raw.filters.len(), 3);
        assert_eq!(raw.filters.get("meal_type").map(String::as_str), Some("dinner"));
        assert_eq!(raw.filters.get("zone").map(String::as_str), Some("patio"));
    }

    #[test]
    fn test_query_from_params_defaults() {
        let raw = query_from_params(&params(&[]));
        assert_eq!(raw.q, "");
        assert_eq!(raw.page, 0);
        assert_eq!(raw.size, 0);
        assert!(raw.filters.is_empty());
    }

    #[test]
    fn test_non_numeric_paging_falls_back() {
        let raw = query_from_params(&params(&[("page", "two"), ("size", "-5")]));
        assert_eq!(raw.page, 0);
        assert_eq!(raw.size, 0);
    }
}
