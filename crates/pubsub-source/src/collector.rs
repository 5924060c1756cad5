//! One bounded fetch cycle for one topic.

use event_schema::SchemaResolver;
use pubsub_stream::{
    classify_status, CloseReason, Lifetime, SessionError, StreamSession, SubscribeTransport,
};
use pubsub_types::{validate_topic, DecodedEvent, ReplayPosition, ReplayToken};
use replay_cursor::CursorStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info};

use crate::error::BatchError;
use crate::processor::{EventProcessor, SkippedEvent};

#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Upper bound on events requested per `FetchRequest`
    pub batch_size: usize,
    /// Look the topic up before subscribing
    pub validate_topic: bool,
    /// How long to wait for in-flight responses after closing
    pub drain_timeout: Duration,
    /// Restart from `Earliest` once if the stored replay token is rejected
    pub fallback_on_invalid_token: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            validate_topic: true,
            drain_timeout: Duration::from_secs(5),
            fallback_on_invalid_token: true,
        }
    }
}

/// Why a batch stopped consuming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    /// `max_events` decoded events were produced
    MaxEvents,
    /// `max_wait` elapsed
    Deadline,
    /// A response had no events and no pending credit
    CaughtUp,
}

impl std::fmt::Display for StopCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopCause::MaxEvents => write!(f, "max events reached"),
            StopCause::Deadline => write!(f, "deadline elapsed"),
            StopCause::CaughtUp => write!(f, "caught up"),
        }
    }
}

/// Result of one fetch cycle.
///
/// `cursor` is the position to persist once `events` are safely downstream.
/// It is `None` only if no position was ever known for the topic.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub topic: String,
    pub start_position: ReplayPosition,
    pub events: Vec<DecodedEvent>,
    pub cursor: Option<ReplayToken>,
    pub skipped: Vec<SkippedEvent>,
    pub responses_received: usize,
    pub stop: StopCause,
}

/// Drives one bounded subscription per call.
pub struct BatchCollector {
    transport: Arc<dyn SubscribeTransport>,
    cursors: Arc<dyn CursorStore>,
    processor: EventProcessor,
    config: BatchConfig,
}

impl BatchCollector {
    pub fn new(
        transport: Arc<dyn SubscribeTransport>,
        cursors: Arc<dyn CursorStore>,
        resolver: Arc<SchemaResolver>,
        config: BatchConfig,
    ) -> Self {
        Self {
            transport,
            cursors,
            processor: EventProcessor::new(resolver),
            config,
        }
    }

    pub fn cursors(&self) -> &Arc<dyn CursorStore> {
        &self.cursors
    }

    /// Fetch up to `max_events` decoded events for `topic`, waiting at most
    /// `max_wait`.
    ///
    /// Starts from the stored cursor, or from `Earliest` when there is none.
    /// Does not persist anything: the caller stores `cursor` after handing
    /// `events` to the sink.
    pub async fn run_once(
        &self,
        topic: &str,
        max_wait: Duration,
        max_events: usize,
    ) -> Result<BatchOutcome, BatchError> {
        validate_topic(topic)?;
        if max_events == 0 {
            return Err(BatchError::InvalidArgs("max_events must be at least 1".to_string()));
        }
        if self.config.batch_size == 0 {
            return Err(BatchError::InvalidArgs("batch_size must be at least 1".to_string()));
        }

        let deadline = Instant::now() + max_wait;
        let cursor = self
            .cursors
            .get(topic)
            .await
            .map_err(|e| BatchError::Cursor {
                topic: topic.to_string(),
                message: format!("{e:#}"),
            })?;

        if self.config.validate_topic {
            self.ensure_subscribable(topic, deadline).await?;
        }

        let start = ReplayPosition::resume_or_earliest(cursor.clone());
        info!(
            "Starting batch for {topic} from {start} (max {max_events} events, max wait {max_wait:?})"
        );

        match self.collect(topic, start.clone(), cursor, deadline, max_events).await {
            Err(BatchError::Session(SessionError::ReplayTokenInvalid { status, .. }))
                if start.is_custom() && self.config.fallback_on_invalid_token =>
            {
                error!(
                    "Stored replay token for {topic} was rejected ({status}); it has probably aged out of the retention window. Restarting from EARLIEST"
                );
                self.collect(topic, ReplayPosition::Earliest, None, deadline, max_events)
                    .await
            }
            other => other,
        }
    }

    async fn ensure_subscribable(&self, topic: &str, deadline: Instant) -> Result<(), BatchError> {
        let info = match timeout_at(deadline, self.transport.topic_info(topic)).await {
            Err(_) => {
                return Err(SessionError::Connect {
                    target: topic.to_string(),
                    message: "timed out looking up topic".to_string(),
                }
                .into())
            }
            Ok(Err(status)) => return Err(classify_status(topic, status, true).into()),
            Ok(Ok(info)) => info,
        };

        if !info.can_subscribe {
            return Err(SessionError::NotFound {
                topic: topic.to_string(),
                message: "topic exists but these credentials cannot subscribe to it".to_string(),
            }
            .into());
        }
        debug!("Topic {topic} is subscribable, current schema {}", info.schema_id);
        Ok(())
    }

    async fn collect(
        &self,
        topic: &str,
        start: ReplayPosition,
        prior_cursor: Option<ReplayToken>,
        deadline: Instant,
        max_events: usize,
    ) -> Result<BatchOutcome, BatchError> {
        let mut session = StreamSession::new(Arc::clone(&self.transport), topic, Lifetime::Bounded);
        let initial_credit = credit(max_events, self.config.batch_size);

        let opened = match timeout_at(deadline, session.open(start.clone(), initial_credit)).await {
            Ok(result) => result.map_err(BatchError::from),
            Err(_) => Err(BatchError::Session(SessionError::Connect {
                target: topic.to_string(),
                message: "timed out opening subscription".to_string(),
            })),
        };
        if let Err(e) = opened {
            session
                .finish(CloseReason::Failed(e.to_string()), self.config.drain_timeout)
                .await;
            return Err(e);
        }

        let mut events = Vec::new();
        let mut skipped = Vec::new();
        let mut cursor = prior_cursor;

        let stop = loop {
            let response = match timeout_at(deadline, session.next_response()).await {
                Err(_) => break StopCause::Deadline,
                Ok(Ok(Some(response))) => response,
                Ok(Ok(None)) => break StopCause::CaughtUp,
                Ok(Err(e)) => {
                    session
                        .finish(CloseReason::Failed(e.to_string()), self.config.drain_timeout)
                        .await;
                    return Err(e.into());
                }
            };

            let caught_up = response.is_caught_up();
            let pending_credit = response.pending_credit;
            let mut stopped_mid_response = false;

            for raw in response.events {
                if events.len() >= max_events {
                    stopped_mid_response = true;
                    break;
                }
                let token = raw.replay_token.clone();
                match self.processor.process(topic, raw).await {
                    Ok(event) => events.push(event),
                    Err(skip) => skipped.push(skip),
                }
                if token.is_some() {
                    cursor = token;
                }
            }

            // the response token covers events we did not process
            if !stopped_mid_response {
                if let Some(token) = response.latest_replay_token {
                    cursor = Some(token);
                }
            }

            if events.len() >= max_events {
                break StopCause::MaxEvents;
            }
            if caught_up {
                break StopCause::CaughtUp;
            }
            if pending_credit == 0 {
                let more = credit(max_events - events.len(), self.config.batch_size);
                if let Err(e) = session.request_more(more) {
                    session
                        .finish(CloseReason::Failed(e.to_string()), self.config.drain_timeout)
                        .await;
                    return Err(e.into());
                }
            }
        };

        let responses_received = session.responses_received();
        let rpc_id = session.last_rpc_id().unwrap_or("-").to_string();
        session
            .finish(CloseReason::BatchComplete, self.config.drain_timeout)
            .await;

        info!(
            "Batch for {topic} finished ({stop}): {} event(s), {} skipped, {} response(s), cursor {}, last rpc id {rpc_id}",
            events.len(),
            skipped.len(),
            responses_received,
            cursor
                .as_ref()
                .map(|t| t.display_hint())
                .unwrap_or_else(|| "none".to_string())
        );

        Ok(BatchOutcome {
            topic: topic.to_string(),
            start_position: start,
            events,
            cursor,
            skipped,
            responses_received,
            stop,
        })
    }
}

/// Credit for one request: what is still wanted, capped at the batch size.
fn credit(remaining: usize, batch_size: usize) -> i32 {
    let n = remaining.min(batch_size).max(1);
    i32::try_from(n).unwrap_or(i32::MAX)
}
