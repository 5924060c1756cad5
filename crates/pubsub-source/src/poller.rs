//! Batch runs over a list of topics.
//!
//! For each topic: collect one batch, hand the events to the sink, and only
//! then store the new cursor. A failure on one topic is logged and the run
//! moves on to the next.

use anyhow::Context;
use event_sink::EventSink;
use pubsub_types::ReplayToken;
use std::time::Duration;
use tracing::{error, info};

use crate::collector::{BatchCollector, StopCause};

/// What one topic produced in a batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicReport {
    pub topic: String,
    pub events_written: usize,
    pub skipped: usize,
    pub cursor: Option<ReplayToken>,
    pub stop: StopCause,
}

#[derive(Debug, Default)]
pub struct PollSummary {
    pub succeeded: Vec<TopicReport>,
    /// Topic and error message
    pub failed: Vec<(String, String)>,
}

impl PollSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total_events(&self) -> usize {
        self.succeeded.iter().map(|r| r.events_written).sum()
    }
}

/// Collect, deliver and commit one batch for `topic`.
pub async fn poll_topic(
    collector: &BatchCollector,
    sink: &dyn EventSink,
    topic: &str,
    max_wait: Duration,
    max_events: usize,
) -> anyhow::Result<TopicReport> {
    let outcome = collector.run_once(topic, max_wait, max_events).await?;

    if !outcome.events.is_empty() {
        sink.write_events(topic, &outcome.events)
            .await
            .with_context(|| {
                format!(
                    "Failed to write {} event(s) for {topic}; cursor not advanced",
                    outcome.events.len()
                )
            })?;
    }

    if let Some(token) = &outcome.cursor {
        let stored = collector
            .cursors()
            .get(topic)
            .await
            .with_context(|| format!("Failed to read cursor for {topic}"))?;
        if stored.as_ref() != Some(token) {
            collector
                .cursors()
                .set(topic, token)
                .await
                .with_context(|| format!("Failed to store cursor for {topic}"))?;
        }
    }

    Ok(TopicReport {
        topic: outcome.topic,
        events_written: outcome.events.len(),
        skipped: outcome.skipped.len(),
        cursor: outcome.cursor,
        stop: outcome.stop,
    })
}

/// Poll every topic in order.
pub async fn run_batch(
    collector: &BatchCollector,
    sink: &dyn EventSink,
    topics: &[String],
    max_wait: Duration,
    max_events: usize,
) -> PollSummary {
    let mut summary = PollSummary::default();

    for topic in topics {
        match poll_topic(collector, sink, topic, max_wait, max_events).await {
            Ok(report) => {
                info!(
                    "{topic}: {} event(s) written, {} skipped ({})",
                    report.events_written, report.skipped, report.stop
                );
                summary.succeeded.push(report);
            }
            Err(e) => {
                error!("{topic}: batch failed: {e:#}");
                summary.failed.push((topic.clone(), format!("{e:#}")));
            }
        }
    }

    info!(
        "Batch run complete: {} event(s) across {} topic(s), {} failed",
        summary.total_events(),
        summary.succeeded.len(),
        summary.failed.len()
    );
    summary
}
