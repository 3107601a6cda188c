//! Core domain types for table availability.
//!
//! The [`TableAvailability`] document is the indexed entity: one document per
//! `(meal_type, table_number, date)` slot, holding whether the slot is
//! bookable and which reservation occupies it. Documents are full
//! projections of the authoritative [`ReservationSnapshot`] plus the static
//! table-capacity catalog, recomputed wholesale on every sync.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Reservation status that releases a table.
pub const STATUS_CANCELLED: &str = "cancelled";

/// Capacity used when a table has no entry in the catalog.
pub const DEFAULT_CAPACITY: u32 = 4;

/// Meal periods served by the restaurant, in reindex order.
pub const MEAL_PERIODS: [&str; 4] = ["breakfast", "lunch", "dinner", "event"];

/// Seats per table for the standard meal periods (tables 1..=10).
const STANDARD_CAPACITIES: [u32; 10] = [2, 2, 4, 4, 4, 6, 6, 6, 8, 8];

/// Seats per table for the event period (tables 1..=10).
const EVENT_CAPACITIES: [u32; 10] = [8, 10, 10, 12, 12, 15, 15, 18, 20, 20];

/// A table's availability for one date and meal period.
///
/// Identity is `(meal_type, table_number, date)`, encoded into `id` as
/// `table-{meal_type}-{table_number}-{date}`. At most one reservation id may
/// occupy a given key; the document is the source of truth for "is this slot
/// bookable".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableAvailability {
    pub id: String,
    pub table_number: u32,
    pub capacity: u32,
    pub meal_type: String,
    /// Calendar date in `YYYY-MM-DD` form.
    pub date: String,
    /// Epoch seconds of the UTC midnight of `date`. Indexed as a numeric
    /// field so date filters can run as half-open range queries.
    pub date_ts: i64,
    pub is_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TableAvailability {
    /// Create a fresh document for a slot, initially available.
    pub fn new(table_number: u32, capacity: u32, meal_type: &str, date: &str) -> Self {
        let now = Utc::now();
        Self {
            id: availability_id(meal_type, table_number, date),
            table_number,
            capacity,
            meal_type: meal_type.to_string(),
            date: date.to_string(),
            date_ts: date_ts(date),
            is_available: true,
            reservation_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the slot occupied by a reservation.
    pub fn occupied(mut self, reservation_id: &str) -> Self {
        self.is_available = false;
        self.reservation_id = Some(reservation_id.to_string());
        self
    }

    /// Mark the slot free.
    pub fn released(mut self) -> Self {
        self.is_available = true;
        self.reservation_id = None;
        self
    }
}

/// Build the document id for a slot: `table-{meal_type}-{table_number}-{date}`.
pub fn availability_id(meal_type: &str, table_number: u32, date: &str) -> String {
    format!("table-{meal_type}-{table_number}-{date}")
}

/// Authoritative reservation state fetched from the reservation source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationSnapshot {
    pub id: String,
    #[serde(default)]
    pub owner_id: String,
    pub table_number: u32,
    #[serde(default)]
    pub guests: u32,
    pub date_time: DateTime<Utc>,
    pub meal_type: String,
    pub status: String,
    #[serde(default)]
    pub total_price: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ReservationSnapshot {
    /// Calendar date of the reservation in `YYYY-MM-DD` form.
    pub fn date(&self) -> String {
        self.date_time.format("%Y-%m-%d").to_string()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == STATUS_CANCELLED
    }
}

/// Look up the configured capacity for a table, if the catalog has it.
pub fn table_capacity(meal_type: &str, table_number: u32) -> Option<u32> {
    let caps = capacities_for(meal_type)?;
    if table_number >= 1 && (table_number as usize) <= caps.len() {
        Some(caps[table_number as usize - 1])
    } else {
        None
    }
}

/// All table capacities for a meal period, in table-number order (table 1 first).
pub fn capacities_for(meal_type: &str) -> Option<&'static [u32]> {
    match meal_type {
        "breakfast" | "lunch" | "dinner" => Some(&STANDARD_CAPACITIES),
        "event" => Some(&EVENT_CAPACITIES),
        _ => None,
    }
}

/// Parse a strict `YYYY-MM-DD` date (four-digit year, zero-padded fields).
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    if !bytes
        .iter()
        .enumerate()
        .all(|(i, b)| matches!(i, 4 | 7) || b.is_ascii_digit())
    {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Half-open UTC day range `[start, end)` in epoch seconds.
pub fn utc_day_range(date: NaiveDate) -> (i64, i64) {
    let start = date.and_time(NaiveTime::MIN).and_utc().timestamp();
    (start, start + 86_400)
}

/// Epoch seconds of the UTC midnight of a `YYYY-MM-DD` date, 0 if unparseable.
pub fn date_ts(date: &str) -> i64 {
    parse_iso_date(date)
        .map(|d| utc_day_range(d).0)
        .unwrap_or_default()
}
