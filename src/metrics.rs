// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation.
//!
//! Uses the `metrics` crate for backend-agnostic collection; the operator
//! chooses the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `availability_engine_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record a search query execution against a backend.
pub fn record_search_query(backend: &str, status: &str) {
    counter!(
        "availability_engine_search_queries_total",
        "backend" => backend.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record search latency by answering tier.
pub fn record_search_latency(tier: &str, duration: Duration) {
    histogram!(
        "availability_engine_search_seconds",
        "tier" => tier.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record a search cache hit/miss.
pub fn record_search_cache(hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    counter!(
        "availability_engine_search_cache_total",
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a handled sync event by operation and status.
pub fn record_sync_event(operation: &str, status: &str) {
    counter!(
        "availability_engine_sync_events_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a consumer delivery outcome (ack, nack, poison, redelivered).
pub fn record_consumer_outcome(outcome: &str) {
    counter!(
        "availability_engine_consumer_messages_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a document-store write.
pub fn record_index_operation(operation: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(
        "availability_engine_index_operations_total",
        "operation" => operation.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record a reindex run and the documents it wrote.
pub fn record_reindex(status: &str, indexed: usize) {
    counter!(
        "availability_engine_reindex_runs_total",
        "status" => status.to_string()
    )
    .increment(1);
    if indexed > 0 {
        counter!("availability_engine_reindex_documents_total").increment(indexed as u64);
    }
}

/// Set the current indexed-document gauge.
pub fn set_document_count(count: usize) {
    gauge!("availability_engine_documents").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    // These verify the API compiles and doesn't panic; exporters are the
    // parent process's concern.

    #[test]
    fn test_counters() {
        record_search_query("engine", "success");
        record_search_cache(true);
        record_search_cache(false);
        record_sync_event("create", "success");
        record_consumer_outcome("ack");
        record_index_operation("index", true);
        record_reindex("success", 1200);
        record_reindex("timeout", 0);
    }

    #[test]
    fn test_latency_and_gauges() {
        record_search_latency("cache", Duration::from_micros(50));
        record_search_latency("engine", Duration::from_millis(5));
        set_document_count(1200);
    }
}
