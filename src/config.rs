//! Service configuration.
//!
//! All fields have defaults suitable for local development; production
//! deployments override them through `AVAILABILITY_*` environment
//! variables. The distributed cache tier is optional: leaving its URL unset
//! degrades the cache to local-only with no error.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Redis Stack connection string (document index + event stream).
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Global key prefix for namespacing shared Redis instances.
    #[serde(default)]
    pub redis_prefix: String,

    /// Distributed cache tier connection string. `None` runs local-only.
    #[serde(default)]
    pub cache_redis_url: Option<String>,

    /// Local cache tier TTL in seconds.
    #[serde(default = "default_local_cache_ttl_secs")]
    pub local_cache_ttl_secs: u64,

    /// Distributed cache tier TTL in seconds.
    #[serde(default = "default_distributed_cache_ttl_secs")]
    pub distributed_cache_ttl_secs: u64,

    /// Event stream key.
    #[serde(default = "default_event_stream")]
    pub event_stream: String,

    /// Consumer group name.
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,

    /// Consumer name within the group.
    #[serde(default = "default_consumer_name")]
    pub consumer_name: String,

    /// Reservation source base URL.
    #[serde(default = "default_reservations_url")]
    pub reservations_url: String,

    /// Per-request timeout for reservation fetches, in seconds.
    #[serde(default = "default_reservation_timeout_secs")]
    pub reservation_timeout_secs: u64,

    /// HTTP listen port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Days of future availability covered by a reindex.
    #[serde(default = "default_reindex_horizon_days")]
    pub reindex_horizon_days: u32,

    /// Overall deadline for one reindex run, in seconds.
    #[serde(default = "default_reindex_deadline_secs")]
    pub reindex_deadline_secs: u64,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}
fn default_local_cache_ttl_secs() -> u64 {
    300
}
fn default_distributed_cache_ttl_secs() -> u64 {
    900
}
fn default_event_stream() -> String {
    "events:reservation".to_string()
}
fn default_consumer_group() -> String {
    "availability-sync".to_string()
}
fn default_consumer_name() -> String {
    format!("availability-{}", std::process::id())
}
fn default_reservations_url() -> String {
    "http://localhost:8081".to_string()
}
fn default_reservation_timeout_secs() -> u64 {
    5
}
fn default_port() -> u16 {
    8082
}
fn default_reindex_horizon_days() -> u32 {
    30
}
fn default_reindex_deadline_secs() -> u64 {
    120
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            redis_prefix: String::new(),
            cache_redis_url: None,
            local_cache_ttl_secs: default_local_cache_ttl_secs(),
            distributed_cache_ttl_secs: default_distributed_cache_ttl_secs(),
            event_stream: default_event_stream(),
            consumer_group: default_consumer_group(),
            consumer_name: default_consumer_name(),
            reservations_url: default_reservations_url(),
            reservation_timeout_secs: default_reservation_timeout_secs(),
            port: default_port(),
            reindex_horizon_days: default_reindex_horizon_days(),
            reindex_deadline_secs: default_reindex_deadline_secs(),
        }
    }
}

impl AppConfig {
    /// Load from `AVAILABILITY_*` environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: env_or("AVAILABILITY_REDIS_URL", defaults.redis_url),
            redis_prefix: env_or("AVAILABILITY_REDIS_PREFIX", defaults.redis_prefix),
            cache_redis_url: std::env::var("AVAILABILITY_CACHE_REDIS_URL")
                .ok()
                .filter(|v| !v.is_empty()),
            local_cache_ttl_secs: env_parsed(
                "AVAILABILITY_LOCAL_CACHE_TTL_SECS",
                defaults.local_cache_ttl_secs,
            ),
            distributed_cache_ttl_secs: env_parsed(
                "AVAILABILITY_DIST_CACHE_TTL_SECS",
                defaults.distributed_cache_ttl_secs,
            ),
            event_stream: env_or("AVAILABILITY_EVENT_STREAM", defaults.event_stream),
            consumer_group: env_or("AVAILABILITY_CONSUMER_GROUP", defaults.consumer_group),
            consumer_name: env_or("AVAILABILITY_CONSUMER_NAME", defaults.consumer_name),
            reservations_url: env_or("AVAILABILITY_RESERVATIONS_URL", defaults.reservations_url),
            reservation_timeout_secs: env_parsed(
                "AVAILABILITY_RESERVATION_TIMEOUT_SECS",
                defaults.reservation_timeout_secs,
            ),
            port: env_parsed("AVAILABILITY_PORT", defaults.port),
            reindex_horizon_days: env_parsed(
                "AVAILABILITY_REINDEX_HORIZON_DAYS",
                defaults.reindex_horizon_days,
            ),
            reindex_deadline_secs: env_parsed(
                "AVAILABILITY_REINDEX_DEADLINE_SECS",
                defaults.reindex_deadline_secs,
            ),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(config.local_cache_ttl_secs, 300);
        assert_eq!(config.distributed_cache_ttl_secs, 900);
        assert_eq!(config.event_stream, "events:reservation");
        assert_eq!(config.consumer_group, "availability-sync");
        assert_eq!(config.port, 8082);
        assert_eq!(config.reindex_horizon_days, 30);
        assert!(config.cache_redis_url.is_none());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: AppConfig =
            serde_json::from_str(r#"{"port": 9090, "cache_redis_url": "redis://cache:6379"}"#)
                .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.cache_redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(config.reindex_deadline_secs, 120);
    }
}
