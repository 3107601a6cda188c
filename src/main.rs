//! Service binary: wires the consumer, synchronizer, search service, and
//! HTTP surface together and runs them until ctrl-c.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{error, info, warn};

use availability_engine::api::{self, AppState};
use availability_engine::cache::{DistributedCache, HybridCache, JsonCodec};
use availability_engine::config::AppConfig;
use availability_engine::consumer::EventConsumer;
use availability_engine::index::RediSearchStore;
use availability_engine::reindex::{self, Reindexer};
use availability_engine::reservations::ReservationClient;
use availability_engine::service::SearchService;
use availability_engine::sync::Synchronizer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::from_env();
    info!(redis = %config.redis_url, port = config.port, "Starting availability engine");

    // Document store. A bad Redis URL fails startup after the retry ceiling.
    let store = Arc::new(RediSearchStore::connect(&config.redis_url, &config.redis_prefix).await?);
    store.ensure_index().await?;

    // Hybrid cache; the distributed tier is optional and its absence (or a
    // failed connect) degrades to local-only caching.
    let distributed = match &config.cache_redis_url {
        Some(url) => match DistributedCache::connect(
            url,
            Duration::from_secs(config.distributed_cache_ttl_secs),
            &config.redis_prefix,
        )
        .await
        {
            Ok(tier) => Some(tier),
            Err(e) => {
                warn!(error = %e, "Distributed cache disabled");
                None
            }
        },
        None => None,
    };
    let cache = Arc::new(HybridCache::new(
        Duration::from_secs(config.local_cache_ttl_secs),
        distributed,
        Box::new(JsonCodec),
    ));

    let reservations = Arc::new(ReservationClient::new(
        &config.reservations_url,
        Duration::from_secs(config.reservation_timeout_secs),
    )?);

    let synchronizer = Arc::new(Synchronizer::new(
        store.clone(),
        reservations.clone(),
        cache.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Background event consumer.
    let consumer = EventConsumer::connect(
        &config.redis_url,
        &config.event_stream,
        &config.consumer_group,
        &config.consumer_name,
        synchronizer,
        shutdown_rx.clone(),
    )
    .await?;
    tokio::spawn(consumer.run());

    // Initial reindex populates the index before traffic warms the cache;
    // it is deadline-bounded so startup is never blocked on it.
    let reindex_status = Arc::new(RwLock::new(None));
    let reindexer = Arc::new(Reindexer::new(
        store.clone(),
        reservations,
        cache.clone(),
        config.reindex_horizon_days,
        reindex_status.clone(),
    ));
    let reindex_deadline = Duration::from_secs(config.reindex_deadline_secs);
    reindex::spawn_supervised(reindexer.clone(), reindex_deadline);

    let service = Arc::new(SearchService::new(store, cache, reindex_status));
    let state = AppState {
        service,
        reindexer,
        reindex_deadline,
    };

    // Flip the shutdown signal on ctrl-c; the consumer checks it between
    // reads and the server drains gracefully.
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    api::serve(state, config.port, shutdown_rx).await?;
    info!("Availability engine stopped");
    Ok(())
}
