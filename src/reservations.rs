//! Reservation source client.
//!
//! The reservation service owns reservation CRUD; this core only reads from
//! it. [`ReservationSource`] is the seam the synchronizer and reindexer
//! depend on, so tests can script snapshots without a live service.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::ReservationSnapshot;

#[derive(Error, Debug)]
pub enum ReservationError {
    #[error("reservation not found")]
    NotFound,
    #[error("reservation source returned status {0}")]
    Status(u16),
    #[error("reservation source unreachable: {0}")]
    Http(String),
    #[error("malformed reservation payload: {0}")]
    Decode(String),
}

/// Read access to the authoritative reservation state.
#[async_trait]
pub trait ReservationSource: Send + Sync {
    /// Fetch one reservation snapshot by id.
    async fn get_by_id(&self, id: &str) -> Result<ReservationSnapshot, ReservationError>;

    /// Fetch the complete reservation set (used by the reindexer).
    async fn list_all(&self) -> Result<Vec<ReservationSnapshot>, ReservationError>;
}

/// HTTP client for the reservation source.
pub struct ReservationClient {
    base_url: String,
    http: reqwest::Client,
}

impl ReservationClient {
    /// Build a client with a per-request timeout; a timed-out fetch fails
    /// the sync handler and the event is redelivered.
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Result<Self, ReservationError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReservationError::Http(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[async_trait]
impl ReservationSource for ReservationClient {
    async fn get_by_id(&self, id: &str) -> Result<ReservationSnapshot, ReservationError> {
        let url = format!("{}/reservations/{}", self.base_url, id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ReservationError::Http(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json()
                .await
                .map_err(|e| ReservationError::Decode(e.to_string())),
            reqwest::StatusCode::NOT_FOUND => Err(ReservationError::NotFound),
            status => Err(ReservationError::Status(status.as_u16())),
        }
    }

    async fn list_all(&self) -> Result<Vec<ReservationSnapshot>, ReservationError> {
        let url = format!("{}/reservations", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ReservationError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ReservationError::Status(response.status().as_u16()));
        }
        response
            .json()
            .await
            .map_err(|e| ReservationError::Decode(e.to_string()))
    }
}
