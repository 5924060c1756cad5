//! Sinks that do not write files.

use anyhow::Result;
use async_trait::async_trait;
use pubsub_types::DecodedEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::traits::EventSink;

/// Logs what would be written and discards it.
#[derive(Debug, Default)]
pub struct DryRunSink;

#[async_trait]
impl EventSink for DryRunSink {
    async fn write_events(&self, topic: &str, events: &[DecodedEvent]) -> Result<()> {
        tracing::info!("[dry-run] Would write {} event(s) for {topic}", events.len());
        for event in events {
            tracing::debug!(
                "[dry-run] {} {} schema {}",
                topic,
                event.event_id,
                event.schema_id
            );
        }
        Ok(())
    }
}

/// Keeps every batch in memory. Can be switched to fail writes.
#[derive(Debug, Default)]
pub struct RecordingSink {
    batches: Mutex<Vec<(String, Vec<DecodedEvent>)>>,
    fail: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Recorded batches as `(topic, events)`, in write order.
    pub fn batches(&self) -> Vec<(String, Vec<DecodedEvent>)> {
        self.batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// All recorded events for `topic`, flattened.
    pub fn events_for(&self, topic: &str) -> Vec<DecodedEvent> {
        self.batches()
            .into_iter()
            .filter(|(t, _)| t == topic)
            .flat_map(|(_, events)| events)
            .collect()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn write_events(&self, topic: &str, events: &[DecodedEvent]) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("Sink rejected {} event(s) for {topic}", events.len());
        }
        self.batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((topic.to_string(), events.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_sink_failure_switch() {
        let sink = RecordingSink::new();
        sink.write_events("/event/A", &[]).await.unwrap();
        assert_eq!(sink.batches().len(), 1);

        sink.set_failing(true);
        assert!(sink.write_events("/event/A", &[]).await.is_err());
        assert_eq!(sink.batches().len(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_accepts_everything() {
        assert!(DryRunSink.write_events("/event/A", &[]).await.is_ok());
    }
}
