//! Cache introspection handlers.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::Json;
use serde_json::{json, Value};

use crate::cache::CacheStats;

use super::error::ApiError;
use super::AppState;

pub async fn stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.service.cache_stats())
}

pub async fn get_value(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let key = params
        .get("key")
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::bad_request("key parameter required"))?;

    match state.service.cache_value(key).await {
        Some(value) => Ok(Json(json!({ "key": key, "value": value }))),
        None => Err(ApiError::not_found("key not found in cache")),
    }
}

pub async fn invalidate(State(state): State<AppState>) -> Json<Value> {
    state.service.invalidate_all();
    Json(json!({ "status": "cache invalidated" }))
}
