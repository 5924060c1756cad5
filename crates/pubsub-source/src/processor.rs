//! Per-event schema resolution and decoding.

use chrono::Utc;
use event_schema::{EventDecoder, SchemaResolver};
use pubsub_types::{DecodedEvent, RawEvent, ReplayToken};
use std::sync::Arc;
use tracing::{error, warn};

/// Why an event was skipped instead of decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    MissingPayload,
    SchemaUnavailable(String),
    Decode(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingPayload => write!(f, "event has no payload"),
            SkipReason::SchemaUnavailable(message) => write!(f, "{message}"),
            SkipReason::Decode(message) => write!(f, "{message}"),
        }
    }
}

/// An event that could not be decoded. Its replay token still counts as
/// observed, so it is not fetched again.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEvent {
    pub event_id: String,
    pub schema_id: String,
    pub replay_token: Option<ReplayToken>,
    pub reason: SkipReason,
}

impl SkippedEvent {
    fn new(raw: RawEvent, reason: SkipReason) -> Self {
        Self {
            event_id: raw.event_id,
            schema_id: raw.schema_id,
            replay_token: raw.replay_token,
            reason,
        }
    }
}

/// Turns raw events into decoded events.
pub struct EventProcessor {
    resolver: Arc<SchemaResolver>,
    decoder: EventDecoder,
}

impl EventProcessor {
    pub fn new(resolver: Arc<SchemaResolver>) -> Self {
        Self {
            resolver,
            decoder: EventDecoder::new(),
        }
    }

    /// Decode one event. Failures are logged and returned as a skip, never
    /// as an error for the batch.
    pub async fn process(&self, topic: &str, raw: RawEvent) -> Result<DecodedEvent, SkippedEvent> {
        let Some(payload) = raw.payload.as_deref() else {
            warn!(
                "Skipping event {} on {topic} at {}: no payload",
                raw.event_id,
                token_hint(&raw.replay_token)
            );
            return Err(SkippedEvent::new(raw, SkipReason::MissingPayload));
        };

        let handle = match self.resolver.resolve(&raw.schema_id).await {
            Ok(handle) => handle,
            Err(e) => {
                error!(
                    "Skipping event {} on {topic} at {}: {e}",
                    raw.event_id,
                    token_hint(&raw.replay_token)
                );
                let reason = SkipReason::SchemaUnavailable(e.to_string());
                return Err(SkippedEvent::new(raw, reason));
            }
        };

        let fields = match self.decoder.decode(&handle, payload) {
            Ok(fields) => fields,
            Err(e) => {
                error!(
                    "Skipping event {} on {topic} at {}: {e}",
                    raw.event_id,
                    token_hint(&raw.replay_token)
                );
                let reason = SkipReason::Decode(e.to_string());
                return Err(SkippedEvent::new(raw, reason));
            }
        };

        Ok(DecodedEvent {
            topic: topic.to_string(),
            schema_id: raw.schema_id,
            event_id: raw.event_id,
            replay_token: raw.replay_token,
            fields,
            decoded_at: Utc::now(),
        })
    }
}

fn token_hint(token: &Option<ReplayToken>) -> String {
    token
        .as_ref()
        .map(|t| t.display_hint())
        .unwrap_or_else(|| "unknown position".to_string())
}
