//! Bulk index rebuild.
//!
//! Walks the full cross-product of meal periods, tables, and a future day
//! window, deriving each slot's state from the complete reservation set
//! fetched once up front. Used for bootstrap and for repairing drift; it is
//! not transactional - partial progress is fine because real-time sync keeps
//! correcting state afterwards.
//!
//! Runs are spawned as supervised, deadline-bounded background tasks; the
//! outcome of the latest run is published to a shared status slot surfaced
//! by the stats endpoint.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Days, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::cache::HybridCache;
use crate::domain::{capacities_for, TableAvailability, MEAL_PERIODS};
use crate::index::{AvailabilityStore, SearchResult};
use crate::metrics;
use crate::reservations::ReservationSource;
use crate::sync::SyncError;

/// Result of the most recent reindex run.
#[derive(Debug, Clone, Serialize)]
pub struct ReindexOutcome {
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub indexed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct Reindexer {
    store: Arc<dyn AvailabilityStore>,
    reservations: Arc<dyn ReservationSource>,
    cache: Arc<HybridCache<SearchResult>>,
    horizon_days: u32,
    status: Arc<RwLock<Option<ReindexOutcome>>>,
}

impl Reindexer {
    pub fn new(
        store: Arc<dyn AvailabilityStore>,
        reservations: Arc<dyn ReservationSource>,
        cache: Arc<HybridCache<SearchResult>>,
        horizon_days: u32,
        status: Arc<RwLock<Option<ReindexOutcome>>>,
    ) -> Self {
        Self {
            store,
            reservations,
            cache,
            horizon_days,
            status,
        }
    }

    /// Shared slot holding the most recent run's outcome.
    pub fn status(&self) -> Arc<RwLock<Option<ReindexOutcome>>> {
        self.status.clone()
    }

    /// Rebuild every availability document in the window. Returns the number
    /// of documents indexed.
    pub async fn run(&self) -> Result<usize, SyncError> {
        self.cache.clear();

        let reservations = self.reservations.list_all().await?;
        let reserved = reserved_slots(&reservations);
        info!(
            reservations = reservations.len(),
            reserved = reserved.len(),
            horizon_days = self.horizon_days,
            "Reindex started"
        );

        let today = Utc::now().date_naive();
        let mut indexed = 0;

        for day in 0..u64::from(self.horizon_days) {
            let Some(date) = today.checked_add_days(Days::new(day)) else {
                break;
            };
            let date = date.format("%Y-%m-%d").to_string();

            for meal_type in MEAL_PERIODS {
                let Some(capacities) = capacities_for(meal_type) else {
                    continue;
                };
                for (slot, &capacity) in capacities.iter().enumerate() {
                    let table_number = slot as u32 + 1;
                    let mut doc =
                        TableAvailability::new(table_number, capacity, meal_type, &date);

                    let key = format!("{date}-{meal_type}-{table_number}");
                    if let Some(reservation_id) = reserved.get(&key) {
                        doc = doc.occupied(reservation_id);
                    }

                    self.store.index(&doc).await?;
                    indexed += 1;
                }
            }
        }

        Ok(indexed)
    }
}

/// Map of occupied slots (`date-meal-table` -> reservation id), cancelled
/// reservations excluded.
fn reserved_slots(
    reservations: &[crate::domain::ReservationSnapshot],
) -> HashMap<String, String> {
    reservations
        .iter()
        .filter(|r| !r.is_cancelled())
        .map(|r| {
            (
                format!("{}-{}-{}", r.date(), r.meal_type, r.table_number),
                r.id.clone(),
            )
        })
        .collect()
}

/// Spawn a supervised, deadline-bounded reindex run. The task records its
/// outcome to the shared status slot and metrics; callers fire and forget.
pub fn spawn_supervised(reindexer: Arc<Reindexer>, deadline: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let started = Instant::now();
        let result = tokio::time::timeout(deadline, reindexer.run()).await;

        let outcome = match result {
            Ok(Ok(indexed)) => {
                info!(indexed, elapsed = ?started.elapsed(), "Reindex finished");
                metrics::record_reindex("success", indexed);
                ReindexOutcome {
                    finished_at: Utc::now(),
                    duration_ms: started.elapsed().as_millis() as u64,
                    indexed,
                    error: None,
                }
            }
            Ok(Err(e)) => {
                error!(error = %e, "Reindex failed");
                metrics::record_reindex("error", 0);
                ReindexOutcome {
                    finished_at: Utc::now(),
                    duration_ms: started.elapsed().as_millis() as u64,
                    indexed: 0,
                    error: Some(e.to_string()),
                }
            }
            Err(_) => {
                error!(deadline = ?deadline, "Reindex deadline exceeded");
                metrics::record_reindex("timeout", 0);
                ReindexOutcome {
                    finished_at: Utc::now(),
                    duration_ms: started.elapsed().as_millis() as u64,
                    indexed: 0,
                    error: Some(format!("deadline of {deadline:?} exceeded")),
                }
            }
        };

        *reindexer.status.write() = Some(outcome);
    })
}
