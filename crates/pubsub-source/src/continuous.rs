//! Long-running subscription that keeps requesting events until shutdown.

use anyhow::Context;
use event_sink::EventSink;
use pubsub_stream::{CloseReason, Lifetime, SessionError, StreamSession, SubscribeTransport};
use pubsub_types::{validate_topic, ReplayPosition, ReplayToken};
use replay_cursor::CursorStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::processor::EventProcessor;

#[derive(Debug, Clone)]
pub struct ContinuousConfig {
    /// Interval between follow-up credit requests
    pub fetch_interval: Duration,
    pub batch_size: usize,
    pub drain_timeout: Duration,
    pub fallback_on_invalid_token: bool,
}

impl Default for ContinuousConfig {
    fn default() -> Self {
        Self {
            fetch_interval: Duration::from_secs(30),
            batch_size: 100,
            drain_timeout: Duration::from_secs(5),
            fallback_on_invalid_token: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContinuousSummary {
    pub responses: usize,
    pub events_written: usize,
    pub skipped: usize,
    pub cursor: Option<ReplayToken>,
}

/// Subscribe to `topic` and write every decoded event to `sink` until
/// `shutdown` resolves.
///
/// The cursor is persisted after each response whose events were written.
pub async fn run_continuous<F>(
    transport: Arc<dyn SubscribeTransport>,
    cursors: Arc<dyn CursorStore>,
    processor: &EventProcessor,
    sink: &dyn EventSink,
    topic: &str,
    config: &ContinuousConfig,
    shutdown: F,
) -> anyhow::Result<ContinuousSummary>
where
    F: Future<Output = ()>,
{
    validate_topic(topic)?;
    if config.batch_size == 0 {
        anyhow::bail!("batch_size must be at least 1");
    }
    let credit = i32::try_from(config.batch_size).unwrap_or(i32::MAX);
    let lifetime = Lifetime::Unbounded {
        interval: config.fetch_interval,
        request_count: credit,
    };

    let stored = cursors
        .get(topic)
        .await
        .with_context(|| format!("Failed to read cursor for {topic}"))?;
    let mut summary = ContinuousSummary {
        cursor: stored.clone(),
        ..Default::default()
    };

    let mut start = ReplayPosition::resume_or_earliest(stored);
    let mut session = open_session(&transport, topic, &lifetime, start.clone(), credit).await?;
    let mut fell_back = false;

    tokio::pin!(shutdown);
    info!(
        "Subscribed to {topic} from {start}, requesting {credit} event(s) every {:?}",
        config.fetch_interval
    );

    loop {
        let response = tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested, closing subscription to {topic}");
                break;
            }
            response = session.next_response() => response,
        };

        let response = match response {
            Ok(Some(response)) => response,
            Ok(None) => break,
            Err(SessionError::ReplayTokenInvalid { status, .. })
                if start.is_custom()
                    && config.fallback_on_invalid_token
                    && !fell_back
                    && summary.responses == 0 =>
            {
                error!(
                    "Stored replay token for {topic} was rejected ({status}); restarting from EARLIEST"
                );
                fell_back = true;
                start = ReplayPosition::Earliest;
                session.finish(CloseReason::Failed(status.to_string()), config.drain_timeout).await;
                session = open_session(&transport, topic, &lifetime, start.clone(), credit).await?;
                continue;
            }
            Err(e) => {
                session.finish(CloseReason::Failed(e.to_string()), config.drain_timeout).await;
                return Err(e).with_context(|| format!("Subscription to {topic} failed"));
            }
        };
        summary.responses += 1;

        let mut decoded = Vec::with_capacity(response.events.len());
        for raw in response.events {
            match processor.process(topic, raw).await {
                Ok(event) => decoded.push(event),
                Err(_) => summary.skipped += 1,
            }
        }

        if !decoded.is_empty() {
            if let Err(e) = sink.write_events(topic, &decoded).await {
                session.finish(CloseReason::Failed(e.to_string()), config.drain_timeout).await;
                return Err(e).with_context(|| format!("Failed to write events for {topic}"));
            }
            summary.events_written += decoded.len();
            info!("Wrote {} event(s) for {topic}", decoded.len());
        }

        if let Some(token) = response.latest_replay_token {
            if summary.cursor.as_ref() != Some(&token) {
                cursors
                    .set(topic, &token)
                    .await
                    .with_context(|| format!("Failed to store cursor for {topic}"))?;
                summary.cursor = Some(token);
            }
        }
    }

    let discarded = session.finish(CloseReason::Shutdown, config.drain_timeout).await;
    if discarded > 0 {
        warn!("{discarded} response(s) for {topic} arrived after shutdown and were not written");
    }
    info!(
        "Subscription to {topic} stopped: {} response(s), {} event(s) written, {} skipped",
        summary.responses, summary.events_written, summary.skipped
    );
    Ok(summary)
}

async fn open_session(
    transport: &Arc<dyn SubscribeTransport>,
    topic: &str,
    lifetime: &Lifetime,
    start: ReplayPosition,
    credit: i32,
) -> anyhow::Result<StreamSession> {
    let mut session = StreamSession::new(Arc::clone(transport), topic, lifetime.clone());
    session
        .open(start, credit)
        .await
        .with_context(|| format!("Failed to subscribe to {topic}"))?;
    Ok(session)
}
