//! Event records from the worker's append-only NDJSON log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One progress event: a single JSON object on one line of
/// `events.ndjson`.
///
/// The worker decides what an event contains; only the most common
/// fields are named here and everything else survives in `extra`, so a
/// record round-trips losslessly regardless of its shape.
///
/// # Examples
///
/// ```
/// use fsbridge::EventRecord;
///
/// let record: EventRecord =
///     serde_json::from_str(r#"{"event":"step","message":"breakpoint hit","line":42}"#).unwrap();
/// assert_eq!(record.event.as_deref(), Some("step"));
/// assert_eq!(record.extra["line"], 42);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Event name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,

    /// Human-readable progress message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// When the worker emitted the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// All other fields, preserved as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
