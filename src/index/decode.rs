//! Engine response decoding.
//!
//! Engine replies arrive as untyped JSON where every field may be a scalar
//! or a single-element array (JSONPath projections wrap values, and the
//! whole document may itself arrive wrapped in an array). This module is the
//! one place that ambiguity is resolved; the rest of the system only sees
//! [`TableAvailability`].

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::{date_ts, TableAvailability};

use super::schema::{
    FIELD_CAPACITY, FIELD_CREATED_AT, FIELD_DATE, FIELD_DATE_TS, FIELD_ID, FIELD_IS_AVAILABLE,
    FIELD_MEAL_TYPE, FIELD_RESERVATION_ID, FIELD_TABLE_NUMBER, FIELD_UPDATED_AT,
};
use super::IndexError;

/// Decode one engine document into a [`TableAvailability`].
pub(crate) fn decode_document(value: &Value) -> Result<TableAvailability, IndexError> {
    // JSON.GET with a `$` path wraps the document in a one-element array.
    let obj = unwrap_singleton(value)
        .as_object()
        .ok_or_else(|| IndexError::Decode(format!("expected object, got {value}")))?;

    let field = |name: &str| obj.get(name).map(unwrap_singleton);

    let date = field(FIELD_DATE)
        .and_then(scalar_str)
        .map(|s| if s.len() > 10 { s[..10].to_string() } else { s })
        .unwrap_or_default();

    let date_ts = field(FIELD_DATE_TS)
        .and_then(scalar_i64)
        .unwrap_or_else(|| date_ts(&date));

    let reservation_id = field(FIELD_RESERVATION_ID)
        .and_then(scalar_str)
        .filter(|s| !s.is_empty());

    Ok(TableAvailability {
        id: field(FIELD_ID).and_then(scalar_str).unwrap_or_default(),
        table_number: field(FIELD_TABLE_NUMBER)
            .and_then(scalar_u64)
            .unwrap_or_default() as u32,
        capacity: field(FIELD_CAPACITY)
            .and_then(scalar_u64)
            .unwrap_or_default() as u32,
        meal_type: field(FIELD_MEAL_TYPE)
            .and_then(scalar_str)
            .unwrap_or_default(),
        date,
        date_ts,
        is_available: field(FIELD_IS_AVAILABLE)
            .and_then(scalar_bool)
            .unwrap_or_default(),
        reservation_id,
        created_at: field(FIELD_CREATED_AT)
            .and_then(scalar_timestamp)
            .unwrap_or(DateTime::UNIX_EPOCH),
        updated_at: field(FIELD_UPDATED_AT)
            .and_then(scalar_timestamp)
            .unwrap_or(DateTime::UNIX_EPOCH),
    })
}

/// Collapse a single-element array onto its element.
fn unwrap_singleton(value: &Value) -> &Value {
    match value {
        Value::Array(items) if items.len() == 1 => &items[0],
        other => other,
    }
}

fn scalar_str(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn scalar_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn scalar_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn scalar_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn scalar_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    scalar_str(value).and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}
