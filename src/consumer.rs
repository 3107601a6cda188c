// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Reservation event consumer.
//!
//! One long-lived background task reading a Redis Stream through a consumer
//! group. Delivery is at-least-once with no ordering guarantee, which the
//! synchronizer's recompute-from-source handling is built for.
//!
//! # Acknowledgement policy
//!
//! - Malformed body or missing required fields: acknowledged immediately and
//!   dropped (poison messages never redeliver).
//! - Synchronizer success: acknowledged.
//! - Synchronizer failure (e.g. reservation source briefly unreachable): not
//!   acknowledged; the entry stays pending and is reclaimed on a later pass.
//!
//! Cancellation is cooperative: a watch signal is checked between reads, and
//! reads block for at most [`BLOCK_MS`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::streams::{
    StreamAutoClaimOptions, StreamAutoClaimReply, StreamId, StreamReadOptions, StreamReadReply,
};
use redis::{AsyncCommands, Client, Value};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::event::ReservationEvent;
use crate::metrics;
use crate::resilience::retry::{retry, RetryConfig};
use crate::sync::Synchronizer;

/// Longest a single read blocks waiting for new entries.
const BLOCK_MS: usize = 1_000;

/// Entries fetched per read.
const READ_BATCH: usize = 16;

/// Pending entries idle at least this long are reclaimed for redelivery.
const CLAIM_MIN_IDLE_MS: u64 = 30_000;

#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error("broker connection failed: {0}")]
    Connect(String),
}

pub struct EventConsumer {
    connection: ConnectionManager,
    stream: String,
    group: String,
    consumer: String,
    sync: Arc<Synchronizer>,
    shutdown: watch::Receiver<bool>,
}

impl EventConsumer {
    /// Connect to the broker and ensure the consumer group exists. Both
    /// steps use the bounded startup retry policy; exhausting it fails
    /// service startup.
    pub async fn connect(
        url: &str,
        stream: &str,
        group: &str,
        consumer: &str,
        sync: Arc<Synchronizer>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, ConsumerError> {
        let client = Client::open(url).map_err(|e| ConsumerError::Connect(e.to_string()))?;

        let connection = retry("consumer_connect", &RetryConfig::startup(), || async {
            ConnectionManager::new(client.clone()).await
        })
        .await
        .map_err(|e: redis::RedisError| ConsumerError::Connect(e.to_string()))?;

        let this = Self {
            connection,
            stream: stream.to_string(),
            group: group.to_string(),
            consumer: consumer.to_string(),
            sync,
            shutdown,
        };
        this.ensure_group().await?;
        Ok(this)
    }

    async fn ensure_group(&self) -> Result<(), ConsumerError> {
        let conn = self.connection.clone();
        let (stream, group) = (self.stream.clone(), self.group.clone());

        // Consume from the beginning: replays are harmless because the
        // synchronizer recomputes from the source of truth.
        let result: Result<(), redis::RedisError> =
            retry("consumer_group_create", &RetryConfig::startup(), || {
                let mut conn = conn.clone();
                let (stream, group) = (stream.clone(), group.clone());
                async move {
                    let _: () = conn.xgroup_create_mkstream(&stream, &group, "0").await?;
                    Ok(())
                }
            })
            .await;

        match result {
            Ok(()) => {
                info!(stream = %self.stream, group = %self.group, "Consumer group created");
                Ok(())
            }
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!(stream = %self.stream, group = %self.group, "Consumer group already exists");
                Ok(())
            }
            Err(e) => Err(ConsumerError::Connect(e.to_string())),
        }
    }

    /// Receive-process-acknowledge loop until the shutdown signal flips.
    pub async fn run(mut self) {
        info!(
            stream = %self.stream,
            group = %self.group,
            consumer = %self.consumer,
            "Event consumer started"
        );

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            // Redelivery pass: take over entries another (or a previous)
            // consumer left pending.
            match self.claim_stale().await {
                Ok(entries) => {
                    for entry in &entries {
                        metrics::record_consumer_outcome("redelivered");
                        self.process_entry(entry).await;
                    }
                }
                Err(e) => warn!(error = %e, "Pending-entry reclaim failed"),
            }

            if *self.shutdown.borrow() {
                break;
            }

            match self.read_new().await {
                Ok(reply) => {
                    for key in &reply.keys {
                        for entry in &key.ids {
                            self.process_entry(entry).await;
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Stream read failed, backing off");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        info!("Event consumer stopped");
    }

    async fn read_new(&self) -> Result<StreamReadReply, redis::RedisError> {
        let mut conn = self.connection.clone();
        let options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(READ_BATCH)
            .block(BLOCK_MS);
        conn.xread_options(&[&self.stream], &[">"], &options).await
    }

    async fn claim_stale(&self) -> Result<Vec<StreamId>, redis::RedisError> {
        let mut conn = self.connection.clone();
        let options = StreamAutoClaimOptions::default().count(READ_BATCH);
        let reply: StreamAutoClaimReply = conn
            .xautoclaim_options(
                &self.stream,
                &self.group,
                &self.consumer,
                CLAIM_MIN_IDLE_MS,
                "0-0",
                options,
            )
            .await?;
        Ok(reply.claimed)
    }

    async fn process_entry(&mut self, entry: &StreamId) {
        // Entries carrying a routing key outside reservation.* are not ours.
        if let Some(routing_key) = field_string(&entry.map, "routing_key") {
            if !routing_key.starts_with("reservation.") {
                debug!(id = %entry.id, routing_key = %routing_key, "Foreign routing key, skipping");
                self.ack(&entry.id, "skipped").await;
                return;
            }
        }

        let Some(payload) = field_string(&entry.map, "payload") else {
            warn!(id = %entry.id, "Stream entry has no payload field, dropping");
            self.ack(&entry.id, "poison").await;
            return;
        };

        let event: ReservationEvent = match serde_json::from_str(&payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(id = %entry.id, error = %e, "Malformed event body, dropping");
                self.ack(&entry.id, "poison").await;
                return;
            }
        };

        if let Err(reason) = event.validate() {
            warn!(id = %entry.id, reason, "Invalid event envelope, dropping");
            self.ack(&entry.id, "poison").await;
            return;
        }

        match self.sync.handle_event(&event).await {
            Ok(()) => self.ack(&entry.id, "ack").await,
            Err(e) => {
                // Leave the entry pending; a later reclaim pass redelivers it.
                warn!(id = %entry.id, error = %e, "Sync failed, leaving entry for redelivery");
                metrics::record_consumer_outcome("nack");
            }
        }
    }

    async fn ack(&mut self, id: &str, outcome: &'static str) {
        let mut conn = self.connection.clone();
        let result: Result<(), redis::RedisError> =
            conn.xack(&self.stream, &self.group, &[id]).await;
        if let Err(e) = result {
            warn!(id = %id, error = %e, "XACK failed");
        }
        metrics::record_consumer_outcome(outcome);
    }
}

fn field_string(map: &HashMap<String, Value>, field: &str) -> Option<String> {
    map.get(field)
        .and_then(|value| redis::from_redis_value(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_string_reads_bulk_strings() {
        let mut map = HashMap::new();
        map.insert(
            "payload".to_string(),
            Value::BulkString(b"{\"x\":1}".to_vec()),
        );
        assert_eq!(field_string(&map, "payload").as_deref(), Some("{\"x\":1}"));
        assert!(field_string(&map, "routing_key").is_none());
    }
}
