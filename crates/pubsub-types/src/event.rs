//! Event types.
//!
//! [`RawEvent`] is what the server delivers; it is consumed immediately into
//! a [`DecodedEvent`], which is the unit handed to downstream sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::replay::ReplayToken;

/// Structured fields decoded from an event payload.
pub type DecodedFields = serde_json::Map<String, serde_json::Value>;

/// A server-delivered event, before decoding.
///
/// Fields the server may omit are optional. A missing payload means the event
/// cannot be decoded and is skipped, never a crash.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawEvent {
    pub schema_id: String,
    pub event_id: String,
    pub replay_token: Option<ReplayToken>,
    pub payload: Option<Vec<u8>>,
}

/// A decoded event. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedEvent {
    pub topic: String,
    pub schema_id: String,
    pub event_id: String,
    pub replay_token: Option<ReplayToken>,
    pub fields: DecodedFields,
    pub decoded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoded_event_json_shape() {
        let mut fields = DecodedFields::new();
        fields.insert("Name".to_string(), serde_json::json!("Acme"));
        let event = DecodedEvent {
            topic: "/event/Foo__e".to_string(),
            schema_id: "schema-1".to_string(),
            event_id: "evt-1".to_string(),
            replay_token: Some(ReplayToken::new(b"tok1".to_vec()).unwrap()),
            fields,
            decoded_at: Utc::now(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["replay_token"], "dG9rMQ==");
        assert_eq!(value["fields"]["Name"], "Acme");

        let back: DecodedEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }
}
