//! Reservation lifecycle event envelope.
//!
//! Events are pointers, not payloads: they name a reservation and an
//! operation, and the synchronizer re-derives the full document from the
//! reservation source. Delivery is at-least-once with no ordering guarantee,
//! so every event means "recompute this reservation's current effect".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entity type this service consumes events for.
pub const ENTITY_RESERVATION: &str = "reservation";

/// Lifecycle operation carried by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOp {
    Create,
    Confirm,
    Update,
    Delete,
    Cancel,
}

impl EventOp {
    /// Parse a wire operation name. Unknown operations return `None` and are
    /// ignored by the synchronizer.
    pub fn parse(op: &str) -> Option<Self> {
        match op {
            "create" => Some(Self::Create),
            "confirm" => Some(Self::Confirm),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            "cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// JSON envelope published by the reservation source.
///
/// The optional `table_number`/`meal_type`/`date` fields carry the last-known
/// slot so hard deletes can still be processed after the source has dropped
/// the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationEvent {
    pub operation: String,
    pub entity_id: String,
    pub entity_type: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub table_number: Option<u32>,
    #[serde(default)]
    pub meal_type: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl ReservationEvent {
    /// Check the required fields. A failure means the message is poison and
    /// must be dropped without redelivery.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.operation.is_empty() {
            return Err("missing operation");
        }
        if self.entity_id.is_empty() {
            return Err("missing entity_id");
        }
        if self.entity_type != ENTITY_RESERVATION {
            return Err("unexpected entity_type");
        }
        Ok(())
    }

    /// Last-known slot fields, if the envelope carries all three.
    pub fn last_known_slot(&self) -> Option<(u32, &str, &str)> {
        match (&self.table_number, &self.meal_type, &self.date) {
            (Some(table), Some(meal), Some(date)) => Some((*table, meal, date)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(op: &str, id: &str, entity: &str) -> ReservationEvent {
        ReservationEvent {
            operation: op.into(),
            entity_id: id.into(),
            entity_type: entity.into(),
            timestamp: None,
            table_number: None,
            meal_type: None,
            date: None,
        }
    }

    #[test]
    fn test_op_parse() {
        assert_eq!(EventOp::parse("create"), Some(EventOp::Create));
        assert_eq!(EventOp::parse("cancel"), Some(EventOp::Cancel));
        assert_eq!(EventOp::parse("archive"), None);
        assert_eq!(EventOp::parse(""), None);
    }

    #[test]
    fn test_validate_requires_fields() {
        assert!(event("create", "R1", ENTITY_RESERVATION).validate().is_ok());
        assert_eq!(
            event("", "R1", ENTITY_RESERVATION).validate(),
            Err("missing operation")
        );
        assert_eq!(
            event("create", "", ENTITY_RESERVATION).validate(),
            Err("missing entity_id")
        );
        assert_eq!(
            event("create", "R1", "order").validate(),
            Err("unexpected entity_type")
        );
    }

    #[test]
    fn test_envelope_decodes_without_optional_fields() {
        let evt: ReservationEvent = serde_json::from_str(
            r#"{"operation":"create","entity_id":"R1","entity_type":"reservation","timestamp":"2025-03-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(evt.operation, "create");
        assert!(evt.last_known_slot().is_none());
    }

    #[test]
    fn test_envelope_carries_last_known_slot() {
        let evt: ReservationEvent = serde_json::from_str(
            r#"{"operation":"delete","entity_id":"R1","entity_type":"reservation","table_number":3,"meal_type":"dinner","date":"2025-03-01"}"#,
        )
        .unwrap();
        assert_eq!(evt.last_known_slot(), Some((3, "dinner", "2025-03-01")));
    }
}
