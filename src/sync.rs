// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Event synchronizer.
//!
//! Turns reservation lifecycle events into availability-document writes.
//! Every event is handled by re-deriving the full document from the
//! authoritative reservation snapshot, never by patching a previous copy.
//! That recompute-from-source rule is what makes the handler safe under
//! at-least-once, unordered delivery: replaying an event, or receiving
//! `update` before `create`, converges to the same final document.
//!
//! Successful writes invalidate the hybrid cache wholesale - coarse
//! invalidation trades temporary over-fetching for never serving a stale
//! read.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::HybridCache;
use crate::domain::{table_capacity, TableAvailability, DEFAULT_CAPACITY};
use crate::event::{EventOp, ReservationEvent};
use crate::index::{AvailabilityStore, IndexError, SearchResult};
use crate::metrics;
use crate::reservations::{ReservationError, ReservationSource};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("reservation fetch failed: {0}")]
    Fetch(#[from] ReservationError),
    #[error("index write failed: {0}")]
    Index(#[from] IndexError),
}

/// The slot a reservation occupies.
struct Slot {
    table_number: u32,
    meal_type: String,
    date: String,
}

impl Slot {
    fn capacity(&self) -> u32 {
        match table_capacity(&self.meal_type, self.table_number) {
            Some(capacity) => capacity,
            None => {
                warn!(
                    table = self.table_number,
                    meal_type = %self.meal_type,
                    "No capacity entry for table, using default {}",
                    DEFAULT_CAPACITY
                );
                DEFAULT_CAPACITY
            }
        }
    }
}

pub struct Synchronizer {
    store: Arc<dyn AvailabilityStore>,
    reservations: Arc<dyn ReservationSource>,
    cache: Arc<HybridCache<SearchResult>>,
}

impl Synchronizer {
    pub fn new(
        store: Arc<dyn AvailabilityStore>,
        reservations: Arc<dyn ReservationSource>,
        cache: Arc<HybridCache<SearchResult>>,
    ) -> Self {
        Self {
            store,
            reservations,
            cache,
        }
    }

    /// Apply one lifecycle event. Unknown operations are logged and ignored;
    /// any error means the caller should arrange redelivery.
    pub async fn handle_event(&self, event: &ReservationEvent) -> Result<(), SyncError> {
        let reservation_id = event.entity_id.as_str();
        debug!(op = %event.operation, reservation = %reservation_id, "Handling reservation event");

        let Some(op) = EventOp::parse(&event.operation) else {
            warn!(op = %event.operation, "Unknown operation, ignoring");
            metrics::record_sync_event(&event.operation, "ignored");
            return Ok(());
        };

        let result = match op {
            EventOp::Create | EventOp::Confirm => self.mark_reserved(reservation_id).await,
            EventOp::Update => self.recompute_from_status(reservation_id).await,
            EventOp::Delete | EventOp::Cancel => self.release(event).await,
        };

        match &result {
            Ok(doc_id) => {
                // Coarse invalidation: any write may affect any cached query.
                self.cache.clear();
                info!(op = %event.operation, doc = %doc_id, "Availability updated, cache cleared");
                metrics::record_sync_event(&event.operation, "success");
            }
            Err(e) => {
                warn!(op = %event.operation, reservation = %reservation_id, error = %e, "Sync failed");
                metrics::record_sync_event(&event.operation, "error");
            }
        }
        result.map(|_| ())
    }

    /// create/confirm: the slot is taken by this reservation.
    async fn mark_reserved(&self, reservation_id: &str) -> Result<String, SyncError> {
        let snapshot = self.reservations.get_by_id(reservation_id).await?;
        let slot = Slot {
            table_number: snapshot.table_number,
            meal_type: snapshot.meal_type.clone(),
            date: snapshot.date(),
        };
        let doc = self.build_document(&slot).occupied(reservation_id);
        self.store.index(&doc).await?;
        Ok(doc.id)
    }

    /// update: occupancy follows the snapshot's current status.
    async fn recompute_from_status(&self, reservation_id: &str) -> Result<String, SyncError> {
        let snapshot = self.reservations.get_by_id(reservation_id).await?;
        let slot = Slot {
            table_number: snapshot.table_number,
            meal_type: snapshot.meal_type.clone(),
            date: snapshot.date(),
        };
        let doc = if snapshot.is_cancelled() {
            self.build_document(&slot).released()
        } else {
            self.build_document(&slot).occupied(reservation_id)
        };
        self.store.update(&doc).await?;
        Ok(doc.id)
    }

    /// delete/cancel: the slot becomes free. A hard-deleted reservation may
    /// be gone from the source; fall back to the event's last-known slot.
    async fn release(&self, event: &ReservationEvent) -> Result<String, SyncError> {
        let slot = match self.reservations.get_by_id(&event.entity_id).await {
            Ok(snapshot) => Slot {
                table_number: snapshot.table_number,
                meal_type: snapshot.meal_type.clone(),
                date: snapshot.date(),
            },
            Err(ReservationError::NotFound) => {
                let Some((table_number, meal_type, date)) = event.last_known_slot() else {
                    return Err(SyncError::Fetch(ReservationError::NotFound));
                };
                debug!(reservation = %event.entity_id, "Source dropped record, using last-known slot from event");
                Slot {
                    table_number,
                    meal_type: meal_type.to_string(),
                    date: date.to_string(),
                }
            }
            Err(e) => return Err(e.into()),
        };

        let doc = self.build_document(&slot).released();
        self.store.update(&doc).await?;
        Ok(doc.id)
    }

    fn build_document(&self, slot: &Slot) -> TableAvailability {
        TableAvailability::new(
            slot.table_number,
            slot.capacity(),
            &slot.meal_type,
            &slot.date,
        )
    }
}
