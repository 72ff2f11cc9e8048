// Core data structures for the burstbook engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::utils::parse_wib_timestamp;

/// One event row as returned by the listing endpoint
///
/// The backend is loosely typed: ids and quotas arrive as numbers or
/// strings, and any field may be missing or null.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub event_name: Value,
    #[serde(default)]
    pub quota: Value,
    #[serde(default)]
    pub remaining_quota: Value,
    #[serde(default)]
    pub reservation_start_date: Value,
    #[serde(default)]
    pub reservation_end_date: Value,
    #[serde(default)]
    pub event_date: Value,
    #[serde(default)]
    pub place: Value,
    #[serde(default)]
    pub booking_id: Value,
}

/// Immutable snapshot of a bookable resource
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Resource {
    /// Opaque identifier echoed back in booking payloads
    pub id: String,
    pub name: String,
    pub quota: Option<i64>,
    pub remaining_quota: Option<i64>,
    /// Reservation window as published (WIB wall-clock text)
    pub reservation_start_raw: Option<String>,
    pub reservation_end_raw: Option<String>,
    pub event_date_raw: Option<String>,
    /// Reservation window as absolute instants
    pub reservation_start: Option<DateTime<Utc>>,
    pub reservation_end: Option<DateTime<Utc>>,
    pub event_at: Option<DateTime<Utc>>,
    pub place: Option<String>,
    /// Present when the account already holds a booking for this resource
    pub booking_id: Option<String>,
}

impl Resource {
    /// Create a resource with only an id and a name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the reservation start instant
    #[must_use]
    pub fn with_reservation_start(mut self, start: DateTime<Utc>) -> Self {
        self.reservation_start = Some(start);
        self
    }

    /// Set the event instant
    #[must_use]
    pub fn with_event_at(mut self, at: DateTime<Utc>) -> Self {
        self.event_at = Some(at);
        self
    }

    /// Set capacity and remaining quota
    #[must_use]
    pub fn with_quota(mut self, quota: i64, remaining: i64) -> Self {
        self.quota = Some(quota);
        self.remaining_quota = Some(remaining);
        self
    }

    /// Mark the resource as already booked
    #[must_use]
    pub fn with_booking(mut self, booking_id: impl Into<String>) -> Self {
        self.booking_id = Some(booking_id.into());
        self
    }

    /// Whether the listing reports seats left
    pub fn has_capacity(&self) -> bool {
        self.remaining_quota.is_some_and(|q| q > 0)
    }

    /// Whether the account already holds a booking
    pub fn is_booked(&self) -> bool {
        self.booking_id.is_some()
    }

    /// Case-insensitive substring match against any keyword
    pub fn matches_any(&self, keywords: &[String]) -> bool {
        let name = self.name.to_lowercase();
        keywords.iter().any(|k| name.contains(&k.to_lowercase()))
    }

    /// Instant at which booking opens, when published
    pub fn open_instant(&self) -> Option<DateTime<Utc>> {
        self.reservation_start
    }
}

impl From<EventRecord> for Resource {
    fn from(record: EventRecord) -> Self {
        let reservation_start_raw = loose_string(&record.reservation_start_date);
        let reservation_end_raw = loose_string(&record.reservation_end_date);
        let event_date_raw = loose_string(&record.event_date);

        Self {
            id: loose_string(&record.id).unwrap_or_default(),
            name: loose_string(&record.event_name).unwrap_or_default(),
            quota: loose_i64(&record.quota),
            remaining_quota: loose_i64(&record.remaining_quota),
            reservation_start: reservation_start_raw.as_deref().and_then(parse_wib_timestamp),
            reservation_end: reservation_end_raw.as_deref().and_then(parse_wib_timestamp),
            event_at: event_date_raw.as_deref().and_then(parse_wib_timestamp),
            reservation_start_raw,
            reservation_end_raw,
            event_date_raw,
            place: loose_string(&record.place),
            booking_id: booking_marker(&record.booking_id),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} | start={} | remaining={}",
            self.id,
            self.name,
            self.reservation_start_raw.as_deref().unwrap_or("-"),
            self.remaining_quota
                .map_or_else(|| "?".to_string(), |q| q.to_string()),
        )
    }
}

/// Render a scalar JSON value as text; null and empty strings become `None`
fn loose_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn loose_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Falsy markers (null, false, 0, "") mean "no booking"
fn booking_marker(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => loose_string(other),
    }
}
