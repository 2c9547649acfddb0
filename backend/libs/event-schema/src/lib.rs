//! Event schema for session interaction logs.
//!
//! Every chunk of the event export is a flat list of interactions, one
//! [`EventRecord`] per row. The wire form keeps the short column names of the
//! export (`session`, `aid`, `ts`, `type`) and encodes the interaction kind as
//! an integer code.
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// Per-session views over a chunk
pub mod session;

// Re-export commonly used types
pub use session::{group_sessions, HistoryEvent, SessionBatch, SessionHistory};

pub type SessionId = u64;
pub type ItemId = u64;
/// Milliseconds since the Unix epoch
pub type TimestampMs = i64;

/// One day in milliseconds
pub const DAY_MS: TimestampMs = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("unknown event type code: {0}")]
    UnknownEventType(u8),
}

/// Interaction kind of a single event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EventType {
    Click,
    Cart,
    Order,
}

impl EventType {
    pub const fn code(self) -> u8 {
        match self {
            EventType::Click => 0,
            EventType::Cart => 1,
            EventType::Order => 2,
        }
    }

    /// Cart-adds and orders both count as purchase intent
    pub const fn is_purchase(self) -> bool {
        matches!(self, EventType::Cart | EventType::Order)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Click => "clicks",
            EventType::Cart => "carts",
            EventType::Order => "orders",
        }
    }
}

impl TryFrom<u8> for EventType {
    type Error = SchemaError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(EventType::Click),
            1 => Ok(EventType::Cart),
            2 => Ok(EventType::Order),
            other => Err(SchemaError::UnknownEventType(other)),
        }
    }
}

impl From<EventType> for u8 {
    fn from(event_type: EventType) -> Self {
        event_type.code()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single interaction as produced by the event store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "session")]
    pub session_id: SessionId,
    #[serde(rename = "aid")]
    pub item_id: ItemId,
    #[serde(rename = "ts")]
    pub timestamp: TimestampMs,
    #[serde(rename = "type")]
    pub event_type: EventType,
}

impl EventRecord {
    pub fn new(
        session_id: SessionId,
        item_id: ItemId,
        timestamp: TimestampMs,
        event_type: EventType,
    ) -> Self {
        Self {
            session_id,
            item_id,
            timestamp,
            event_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_codes() {
        assert_eq!(EventType::try_from(0), Ok(EventType::Click));
        assert_eq!(EventType::try_from(1), Ok(EventType::Cart));
        assert_eq!(EventType::try_from(2), Ok(EventType::Order));
        assert_eq!(
            EventType::try_from(7),
            Err(SchemaError::UnknownEventType(7))
        );
        assert_eq!(u8::from(EventType::Order), 2);
    }

    #[test]
    fn test_is_purchase() {
        assert!(!EventType::Click.is_purchase());
        assert!(EventType::Cart.is_purchase());
        assert!(EventType::Order.is_purchase());
    }

    #[test]
    fn test_record_wire_format() {
        let json = r#"{"session":12,"aid":59625,"ts":1661724000278,"type":1}"#;
        let record: EventRecord = serde_json::from_str(json).expect("valid record");

        assert_eq!(record, EventRecord::new(12, 59625, 1661724000278, EventType::Cart));
        assert_eq!(serde_json::to_string(&record).expect("serialize"), json);
    }

    #[test]
    fn test_record_rejects_unknown_type() {
        let json = r#"{"session":1,"aid":2,"ts":3,"type":9}"#;
        assert!(serde_json::from_str::<EventRecord>(json).is_err());
    }
}
