//! EventSink trait definition.
//!
//! The sink is where decoded events go before the replay cursor moves. The
//! poller persists a new cursor only after `write_events` returns `Ok`, so a
//! sink must not report success until the events are durable.

use anyhow::Result;
use pubsub_types::DecodedEvent;

/// Trait for handing decoded events downstream.
///
/// # Usage Pattern
///
/// ```ignore
/// let outcome = collector.run_once(topic, max_wait, max_events).await?;
/// sink.write_events(topic, &outcome.events).await?;
/// if let Some(cursor) = &outcome.cursor {
///     cursors.set(topic, cursor).await?;
/// }
/// ```
#[async_trait::async_trait]
pub trait EventSink: Send + Sync {
    /// Write one batch of decoded events for `topic`.
    ///
    /// Called with an empty slice when a run produced no events; sinks may
    /// treat that as a no-op.
    async fn write_events(&self, topic: &str, events: &[DecodedEvent]) -> Result<()>;
}
