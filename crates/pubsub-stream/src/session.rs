//! Lifetime of one bidirectional subscription.
//!
//! The outbound request stream is produced by a background task that sends
//! the initial request and then blocks until [`StreamSession::close`] is
//! called. It never ends on its own: ending the outbound half makes the peer
//! finalize the inbound half, and the caller would see an empty response
//! sequence with no error anywhere.
//!
//! ```text
//! Idle -> Connecting -> Open -> Draining -> Closed(reason)
//!                  \        \______________/
//!                   \_____________________/  (failure)
//! ```

use futures::StreamExt;
use pubsub_types::{validate_topic, FetchRequest, FetchResponse, ReplayPosition};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tonic::Code;
use tracing::{debug, error, info, warn};

use crate::error::{classify_status, Result, SessionError};
use crate::transport::{ResponseStream, SubscribeTransport};

/// How long the outbound request stream stays alive.
#[derive(Debug, Clone, PartialEq)]
pub enum Lifetime {
    /// Send the initial request, then hold the outbound stream open until
    /// the session is closed. Further credit only via `request_more`.
    Bounded,
    /// Additionally send a follow-up request for `request_count` events
    /// every `interval` until the session is closed.
    Unbounded {
        interval: Duration,
        request_count: i32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CloseReason {
    /// A bounded fetch cycle reached its end
    BatchComplete,
    /// Process shutdown was requested
    Shutdown,
    /// The session was dropped without an explicit close
    Dropped,
    /// The subscription failed
    Failed(String),
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::BatchComplete => write!(f, "batch complete"),
            CloseReason::Shutdown => write!(f, "shutdown"),
            CloseReason::Dropped => write!(f, "dropped"),
            CloseReason::Failed(message) => write!(f, "failed: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Connecting,
    Open,
    Draining,
    Closed(CloseReason),
}

/// One subscription to one topic.
///
/// A session is opened once; resuming after it closes requires a new session.
pub struct StreamSession {
    transport: Arc<dyn SubscribeTransport>,
    topic: String,
    lifetime: Lifetime,
    state: SessionState,
    close_reason: Option<CloseReason>,
    close_tx: watch::Sender<bool>,
    more_tx: Option<mpsc::UnboundedSender<i32>>,
    inbound: Option<ResponseStream>,
    producer: Option<JoinHandle<()>>,
    responses_received: usize,
    last_rpc_id: Option<String>,
    requests_sent: Arc<AtomicUsize>,
}

impl StreamSession {
    pub fn new(transport: Arc<dyn SubscribeTransport>, topic: &str, lifetime: Lifetime) -> Self {
        let (close_tx, _) = watch::channel(false);
        Self {
            transport,
            topic: topic.to_string(),
            lifetime,
            state: SessionState::Idle,
            close_reason: None,
            close_tx,
            more_tx: None,
            inbound: None,
            producer: None,
            responses_received: 0,
            last_rpc_id: None,
            requests_sent: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn responses_received(&self) -> usize {
        self.responses_received
    }

    /// Server correlation id of the most recent response that carried one.
    pub fn last_rpc_id(&self) -> Option<&str> {
        self.last_rpc_id.as_deref()
    }

    /// Requests handed to the transport so far, including the initial one.
    pub fn requests_sent(&self) -> usize {
        self.requests_sent.load(Ordering::SeqCst)
    }

    /// Open the subscription at `start` with `initial_credit` events requested.
    pub async fn open(&mut self, start: ReplayPosition, initial_credit: i32) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(self.invalid_state("open"));
        }
        validate_topic(&self.topic)?;
        if initial_credit <= 0 {
            return Err(SessionError::InvalidCredit(initial_credit));
        }
        if let Lifetime::Unbounded {
            interval,
            request_count,
        } = &self.lifetime
        {
            if interval.is_zero() {
                return Err(SessionError::InvalidInterval);
            }
            if *request_count <= 0 {
                return Err(SessionError::InvalidCredit(*request_count));
            }
        }

        self.state = SessionState::Connecting;
        info!(
            "Opening subscription to {} from {start} requesting {initial_credit} event(s) via {}",
            self.topic,
            self.transport.endpoint()
        );

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (more_tx, more_rx) = mpsc::unbounded_channel();
        let producer = RequestProducer {
            topic: self.topic.clone(),
            lifetime: self.lifetime.clone(),
            outbound: outbound_tx,
            more: more_rx,
            close: self.close_tx.subscribe(),
            sent: Arc::clone(&self.requests_sent),
        };
        let initial = FetchRequest::initial(&self.topic, start, initial_credit);
        self.producer = Some(tokio::spawn(producer.run(initial)));
        self.more_tx = Some(more_tx);

        let requests = UnboundedReceiverStream::new(outbound_rx).boxed();
        match self.transport.subscribe(requests).await {
            Ok(inbound) => {
                self.inbound = Some(inbound);
                self.state = SessionState::Open;
                debug!("Subscription to {} is open", self.topic);
                Ok(())
            }
            Err(status) => {
                let err = classify_status(&self.topic, status, true);
                error!("Failed to open subscription to {}: {err}", self.topic);
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Ask for `count` more events on the open stream.
    pub fn request_more(&mut self, count: i32) -> Result<()> {
        if self.state != SessionState::Open {
            return Err(self.invalid_state("request more from"));
        }
        if count <= 0 {
            return Err(SessionError::InvalidCredit(count));
        }

        let sent = self
            .more_tx
            .as_ref()
            .map(|tx| tx.send(count).is_ok())
            .unwrap_or(false);
        if !sent {
            return Err(SessionError::StreamClosedUnexpectedly {
                topic: self.topic.clone(),
                responses_received: self.responses_received,
            });
        }
        debug!("Requested {count} more event(s) on {}", self.topic);
        Ok(())
    }

    /// Next response, or `None` once the stream ended after `close`.
    pub async fn next_response(&mut self) -> Result<Option<FetchResponse>> {
        let Some(inbound) = self.inbound.as_mut() else {
            return match self.state {
                SessionState::Idle | SessionState::Connecting => {
                    Err(self.invalid_state("read from"))
                }
                _ => Ok(None),
            };
        };

        match inbound.next().await {
            Some(Ok(response)) => {
                self.responses_received += 1;
                if response.rpc_id.is_some() {
                    self.last_rpc_id = response.rpc_id.clone();
                }
                if response.is_caught_up() {
                    info!(
                        "Caught up on {}: zero-event response, latest replay token {} (rpc id {})",
                        self.topic,
                        token_hint(&response),
                        self.rpc_hint()
                    );
                } else if response.is_empty() {
                    debug!(
                        "Keepalive on {} with {} pending (rpc id {})",
                        self.topic,
                        response.pending_credit,
                        self.rpc_hint()
                    );
                } else {
                    debug!(
                        "Received {} event(s) on {}, {} pending (rpc id {})",
                        response.events.len(),
                        self.topic,
                        response.pending_credit,
                        self.rpc_hint()
                    );
                }
                Ok(Some(response))
            }
            Some(Err(status)) => {
                self.inbound = None;
                if self.close_reason.is_some() && status.code == Code::Cancelled {
                    info!(
                        "Subscription to {} cancelled after close, shutting down cleanly",
                        self.topic
                    );
                    self.mark_closed();
                    return Ok(None);
                }

                let err = classify_status(&self.topic, status, self.responses_received == 0);
                error!(
                    "Subscription to {} failed: {err} (last rpc id {})",
                    self.topic,
                    self.rpc_hint()
                );
                self.fail(&err);
                Err(err)
            }
            None => {
                self.inbound = None;
                if self.close_reason.is_some() {
                    debug!("Subscription to {} ended after close", self.topic);
                    self.mark_closed();
                    return Ok(None);
                }

                if self.responses_received == 0 {
                    error!(
                        "Stream for {} closed before any response: the transport ended without a close signal",
                        self.topic
                    );
                } else {
                    warn!(
                        "Stream for {} ended by upstream after {} response(s) without a close signal (last rpc id {})",
                        self.topic,
                        self.responses_received,
                        self.rpc_hint()
                    );
                }
                let err = SessionError::StreamClosedUnexpectedly {
                    topic: self.topic.clone(),
                    responses_received: self.responses_received,
                };
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Signal the outbound request stream to end.
    ///
    /// Idempotent. Inbound responses already in flight can still be read
    /// until the transport completes.
    pub fn close(&mut self, reason: CloseReason) {
        match self.state {
            SessionState::Idle => {
                self.state = SessionState::Closed(reason);
                return;
            }
            SessionState::Draining | SessionState::Closed(_) => return,
            SessionState::Connecting | SessionState::Open => {}
        }

        info!("Closing subscription to {}: {reason}", self.topic);
        self.close_reason = Some(reason);
        self.signal_producer();
        self.state = SessionState::Draining;
    }

    /// Close, drain in-flight responses for at most `drain_timeout`, then
    /// release the transport. Returns the number of responses discarded.
    pub async fn finish(&mut self, reason: CloseReason, drain_timeout: Duration) -> usize {
        self.close(reason);

        let mut drained = 0;
        if let Some(mut inbound) = self.inbound.take() {
            let topic = self.topic.as_str();
            let drain = async {
                while let Some(item) = inbound.next().await {
                    match item {
                        Ok(_) => drained += 1,
                        Err(status) if status.code == Code::Cancelled => break,
                        Err(status) => {
                            warn!("Error while draining {topic}: {status}");
                            break;
                        }
                    }
                }
            };
            if tokio::time::timeout(drain_timeout, drain).await.is_err() {
                warn!("Draining {topic} timed out after {drain_timeout:?}, dropping the stream");
            }
        }
        if drained > 0 {
            info!(
                "Discarded {drained} in-flight response(s) on {} after close; they will be redelivered",
                self.topic
            );
        }

        if let Some(producer) = self.producer.take() {
            if let Err(e) = producer.await {
                warn!("Request producer for {} did not exit cleanly: {e}", self.topic);
            }
        }

        if !matches!(self.state, SessionState::Closed(_)) {
            self.mark_closed();
        }
        drained
    }

    fn mark_closed(&mut self) {
        let reason = self.close_reason.clone().unwrap_or(CloseReason::Dropped);
        self.state = SessionState::Closed(reason);
    }

    fn rpc_hint(&self) -> &str {
        self.last_rpc_id.as_deref().unwrap_or("-")
    }

    fn fail(&mut self, err: &SessionError) {
        self.signal_producer();
        self.inbound = None;
        self.state = SessionState::Closed(CloseReason::Failed(err.to_string()));
    }

    fn signal_producer(&self) {
        // succeeds even when the producer has already exited
        self.close_tx.send_replace(true);
    }

    fn invalid_state(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidState {
            state: format!("{:?}", self.state),
            operation,
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if matches!(self.state, SessionState::Connecting | SessionState::Open) {
            self.close(CloseReason::Dropped);
        }
    }
}

fn token_hint(response: &FetchResponse) -> String {
    response
        .latest_replay_token
        .as_ref()
        .map(|t| t.display_hint())
        .unwrap_or_else(|| "-".to_string())
}

/// Background task owning the outbound half.
struct RequestProducer {
    topic: String,
    lifetime: Lifetime,
    outbound: mpsc::UnboundedSender<FetchRequest>,
    more: mpsc::UnboundedReceiver<i32>,
    close: watch::Receiver<bool>,
    sent: Arc<AtomicUsize>,
}

impl RequestProducer {
    async fn run(mut self, initial: FetchRequest) {
        if !self.send(initial) {
            return;
        }

        let mut ticker = match &self.lifetime {
            Lifetime::Bounded => None,
            Lifetime::Unbounded { interval, .. } => {
                let mut ticker = tokio::time::interval_at(Instant::now() + *interval, *interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                Some(ticker)
            }
        };
        let tick_count = match &self.lifetime {
            Lifetime::Unbounded { request_count, .. } => *request_count,
            Lifetime::Bounded => 0,
        };
        let mut more_open = true;

        loop {
            if *self.close.borrow_and_update() {
                break;
            }

            tokio::select! {
                changed = self.close.changed() => {
                    // an error means the session itself is gone
                    if changed.is_err() {
                        break;
                    }
                }
                count = self.more.recv(), if more_open => match count {
                    Some(count) => {
                        if !self.send(FetchRequest::more(&self.topic, count)) {
                            break;
                        }
                    }
                    None => more_open = false,
                },
                _ = next_tick(&mut ticker) => {
                    debug!("Periodic request for {tick_count} more event(s) on {}", self.topic);
                    if !self.send(FetchRequest::more(&self.topic, tick_count)) {
                        break;
                    }
                }
            }
        }

        debug!("Outbound request stream for {} finished after close", self.topic);
    }

    fn send(&self, request: FetchRequest) -> bool {
        if self.outbound.send(request).is_err() {
            debug!("Transport stopped reading requests for {}", self.topic);
            return false;
        }
        self.sent.fetch_add(1, Ordering::SeqCst);
        true
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatusDetail;
    use crate::testing::{ScriptStep, ScriptedTransport};
    use pubsub_types::{RawEvent, ReplayToken};

    const TOPIC: &str = "/event/Order__e";

    fn token(n: u8) -> ReplayToken {
        ReplayToken::new(vec![0, 0, 0, n]).unwrap()
    }

    fn response(events: u8, pending: i32) -> FetchResponse {
        FetchResponse {
            events: (1..=events)
                .map(|i| RawEvent {
                    schema_id: "schema-1".to_string(),
                    event_id: format!("evt-{i}"),
                    replay_token: Some(token(i)),
                    payload: Some(vec![i]),
                })
                .collect(),
            latest_replay_token: Some(token(events.max(1))),
            pending_credit: pending,
            rpc_id: None,
        }
    }

    fn session(transport: &Arc<ScriptedTransport>, lifetime: Lifetime) -> StreamSession {
        StreamSession::new(Arc::clone(transport) as Arc<dyn SubscribeTransport>, TOPIC, lifetime)
    }

    #[tokio::test]
    async fn test_bounded_session_keeps_outbound_open_until_close() {
        let transport = Arc::new(ScriptedTransport::new().with_topic(TOPIC, |_| {
            vec![
                ScriptStep::Pause(Duration::from_millis(50)),
                ScriptStep::Respond(response(3, 0)),
            ]
        }));
        let mut session = session(&transport, Lifetime::Bounded);

        session.open(ReplayPosition::Earliest, 10).await.unwrap();
        assert_eq!(session.state(), &SessionState::Open);

        let first = session.next_response().await.unwrap().unwrap();
        assert_eq!(first.events.len(), 3);

        session.close(CloseReason::BatchComplete);
        assert_eq!(session.state(), &SessionState::Draining);
        assert!(session.next_response().await.unwrap().is_none());
        assert_eq!(
            session.state(),
            &SessionState::Closed(CloseReason::BatchComplete)
        );
        assert_eq!(session.requests_sent(), 1);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let transport = Arc::new(
            ScriptedTransport::new().with_topic(TOPIC, |_| vec![ScriptStep::Respond(response(1, 0))]),
        );
        let mut session = session(&transport, Lifetime::Bounded);
        session.open(ReplayPosition::Earliest, 10).await.unwrap();

        session.close(CloseReason::BatchComplete);
        session.close(CloseReason::Shutdown);
        assert_eq!(session.state(), &SessionState::Draining);

        session.finish(CloseReason::Shutdown, Duration::from_secs(1)).await;
        assert_eq!(
            session.state(),
            &SessionState::Closed(CloseReason::BatchComplete)
        );

        session.close(CloseReason::Shutdown);
        assert_eq!(
            session.state(),
            &SessionState::Closed(CloseReason::BatchComplete)
        );
        assert!(session.next_response().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancelled_after_close_is_clean() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_topic(TOPIC, |_| vec![ScriptStep::Respond(response(1, 5))])
                .with_cancel_on_close(),
        );
        let mut session = session(&transport, Lifetime::Bounded);
        session.open(ReplayPosition::Earliest, 10).await.unwrap();
        assert!(session.next_response().await.unwrap().is_some());

        session.close(CloseReason::Shutdown);
        assert!(session.next_response().await.unwrap().is_none());
        assert_eq!(session.state(), &SessionState::Closed(CloseReason::Shutdown));
    }

    #[tokio::test]
    async fn test_upstream_end_without_close_is_an_error() {
        let transport = Arc::new(ScriptedTransport::new().with_topic(TOPIC, |_| {
            vec![ScriptStep::Respond(response(2, 0)), ScriptStep::End]
        }));
        let mut session = session(&transport, Lifetime::Bounded);
        session.open(ReplayPosition::Earliest, 10).await.unwrap();

        assert!(session.next_response().await.unwrap().is_some());
        let err = session.next_response().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::StreamClosedUnexpectedly {
                responses_received: 1,
                ..
            }
        ));
        assert!(matches!(
            session.state(),
            SessionState::Closed(CloseReason::Failed(_))
        ));
    }

    #[tokio::test]
    async fn test_open_unknown_topic_is_not_found() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut session = session(&transport, Lifetime::Bounded);

        let err = session.open(ReplayPosition::Earliest, 10).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound { .. }));
        assert!(matches!(session.state(), SessionState::Closed(_)));
    }

    #[tokio::test]
    async fn test_open_auth_failure_is_connect_error() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_topic(TOPIC, |_| vec![])
                .with_open_error(TOPIC, StatusDetail::new(Code::Unauthenticated, "bad token")),
        );
        let mut session = session(&transport, Lifetime::Bounded);

        let err = session.open(ReplayPosition::Earliest, 10).await.unwrap_err();
        assert!(matches!(err, SessionError::Connect { .. }));
    }

    #[tokio::test]
    async fn test_open_twice_is_rejected() {
        let transport = Arc::new(ScriptedTransport::new().with_topic(TOPIC, |_| vec![]));
        let mut session = session(&transport, Lifetime::Bounded);
        session.open(ReplayPosition::Earliest, 10).await.unwrap();

        let err = session.open(ReplayPosition::Earliest, 10).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidState { .. }));
        session.finish(CloseReason::BatchComplete, Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_invalid_credit() {
        let transport = Arc::new(ScriptedTransport::new().with_topic(TOPIC, |_| vec![]));
        let mut session = session(&transport, Lifetime::Bounded);
        assert!(matches!(
            session.open(ReplayPosition::Earliest, 0).await,
            Err(SessionError::InvalidCredit(0))
        ));
    }

    #[tokio::test]
    async fn test_unbounded_zero_interval_rejected() {
        let transport = Arc::new(ScriptedTransport::new().with_topic(TOPIC, |_| vec![]));
        let mut session = session(
            &transport,
            Lifetime::Unbounded {
                interval: Duration::ZERO,
                request_count: 10,
            },
        );

        let err = session.open(ReplayPosition::Latest, 10).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidInterval));
        assert_eq!(session.state(), &SessionState::Idle);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_unbounded_non_positive_request_count_rejected() {
        let transport = Arc::new(ScriptedTransport::new().with_topic(TOPIC, |_| vec![]));
        let mut session = session(
            &transport,
            Lifetime::Unbounded {
                interval: Duration::from_secs(30),
                request_count: 0,
            },
        );

        assert!(matches!(
            session.open(ReplayPosition::Latest, 10).await,
            Err(SessionError::InvalidCredit(0))
        ));
    }

    #[tokio::test]
    async fn test_tracks_last_rpc_id() {
        let transport = Arc::new(ScriptedTransport::new().with_topic(TOPIC, |_| {
            let mut first = response(1, 5);
            first.rpc_id = Some("rpc-a".to_string());
            vec![
                ScriptStep::Respond(first),
                ScriptStep::Respond(response(1, 4)),
            ]
        }));
        let mut session = session(&transport, Lifetime::Bounded);
        session.open(ReplayPosition::Earliest, 10).await.unwrap();
        assert_eq!(session.last_rpc_id(), None);

        session.next_response().await.unwrap();
        assert_eq!(session.last_rpc_id(), Some("rpc-a"));

        // a response without an id keeps the previous one
        session.next_response().await.unwrap();
        assert_eq!(session.last_rpc_id(), Some("rpc-a"));
        session.finish(CloseReason::BatchComplete, Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_request_more_reaches_transport() {
        let transport = Arc::new(ScriptedTransport::new().with_topic(TOPIC, |_| {
            vec![
                ScriptStep::Respond(response(2, 0)),
                ScriptStep::AwaitRequest,
                ScriptStep::Respond(response(1, 0)),
            ]
        }));
        let mut session = session(&transport, Lifetime::Bounded);
        session.open(ReplayPosition::Earliest, 2).await.unwrap();

        assert_eq!(session.next_response().await.unwrap().unwrap().events.len(), 2);
        session.request_more(5).unwrap();
        assert_eq!(session.next_response().await.unwrap().unwrap().events.len(), 1);

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].is_initial());
        assert_eq!(requests[1], FetchRequest::more(TOPIC, 5));
        session.finish(CloseReason::BatchComplete, Duration::from_secs(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_session_requests_on_interval() {
        let transport = Arc::new(ScriptedTransport::new().with_topic(TOPIC, |_| {
            vec![
                ScriptStep::Respond(response(1, 0)),
                ScriptStep::AwaitRequest,
                ScriptStep::Respond(response(1, 0)),
                ScriptStep::AwaitRequest,
                ScriptStep::Respond(response(1, 0)),
            ]
        }));
        let mut session = session(
            &transport,
            Lifetime::Unbounded {
                interval: Duration::from_secs(30),
                request_count: 10,
            },
        );
        session.open(ReplayPosition::Latest, 10).await.unwrap();

        for _ in 0..3 {
            assert!(session.next_response().await.unwrap().is_some());
        }
        session.finish(CloseReason::Shutdown, Duration::from_secs(1)).await;

        let requests = transport.requests();
        assert!(requests.len() >= 3);
        assert!(requests[1..]
            .iter()
            .all(|r| *r == FetchRequest::more(TOPIC, 10)));
        assert_eq!(session.state(), &SessionState::Closed(CloseReason::Shutdown));
    }

    #[tokio::test]
    async fn test_finish_drains_in_flight_responses() {
        let transport = Arc::new(ScriptedTransport::new().with_topic(TOPIC, |_| {
            vec![
                ScriptStep::Respond(response(1, 5)),
                ScriptStep::Respond(response(1, 4)),
            ]
        }));
        let mut session = session(&transport, Lifetime::Bounded);
        session.open(ReplayPosition::Earliest, 10).await.unwrap();
        assert!(session.next_response().await.unwrap().is_some());

        session.finish(CloseReason::BatchComplete, Duration::from_secs(1)).await;
        assert_eq!(
            session.state(),
            &SessionState::Closed(CloseReason::BatchComplete)
        );
    }

    #[tokio::test]
    async fn test_drop_releases_outbound_stream() {
        let transport = Arc::new(ScriptedTransport::new().with_topic(TOPIC, |_| vec![]));
        {
            let mut session = session(&transport, Lifetime::Bounded);
            session.open(ReplayPosition::Earliest, 10).await.unwrap();
        }
        tokio::time::timeout(Duration::from_secs(1), transport.wait_for_outbound_end())
            .await
            .unwrap();
    }
}
