//! Offline transport serving events from JSON fixture files.
//!
//! `<dir>/<event_name>.json` holds a JSON array of events, where the event
//! name is the last `/` segment of the topic:
//!
//! ```json
//! [{"event_id": "e1", "schema_id": "abc", "replay_id": "AAAAAQ==", "payload": "<base64 Avro>"}]
//! ```
//!
//! A missing file means the topic has no events. Once every event has been
//! delivered the transport reports caught-up and holds the call open until
//! the client closes it.

use async_trait::async_trait;
use base64::Engine;
use futures::StreamExt;
use pubsub_types::{topic_event_name, FetchResponse, RawEvent, ReplayPosition, ReplayToken, TopicInfo};
use serde::Deserialize;
use std::collections::VecDeque;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tonic::Code;
use tracing::{debug, info};

use crate::error::StatusDetail;
use crate::transport::{RequestStream, ResponseStream, SubscribeTransport};

#[derive(Debug, Deserialize)]
struct FixtureEvent {
    event_id: String,
    schema_id: String,
    replay_id: String,
    #[serde(default)]
    payload: Option<String>,
}

impl FixtureEvent {
    fn into_raw(self) -> Result<RawEvent, String> {
        let engine = base64::engine::general_purpose::STANDARD;
        let replay_id = engine
            .decode(&self.replay_id)
            .map_err(|e| format!("event {}: invalid replay_id: {e}", self.event_id))?;
        let replay_token = ReplayToken::new(replay_id)
            .map_err(|e| format!("event {}: {e}", self.event_id))?;
        let payload = match self.payload {
            Some(encoded) if !encoded.is_empty() => Some(
                engine
                    .decode(&encoded)
                    .map_err(|e| format!("event {}: invalid payload: {e}", self.event_id))?,
            ),
            _ => None,
        };

        Ok(RawEvent {
            schema_id: self.schema_id,
            event_id: self.event_id,
            replay_token: Some(replay_token),
            payload,
        })
    }
}

pub struct FixtureTransport {
    dir: PathBuf,
}

impl FixtureTransport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn fixture_path(&self, topic: &str) -> PathBuf {
        self.dir.join(format!("{}.json", topic_event_name(topic)))
    }

    /// All events in the fixture file for `topic`, in file order.
    pub async fn load(&self, topic: &str) -> Result<Vec<RawEvent>, StatusDetail> {
        let path = self.fixture_path(topic);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No fixture file for {topic} at {}", path.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(StatusDetail::new(
                    Code::Internal,
                    format!("Failed to read {}: {e}", path.display()),
                ))
            }
        };

        let entries: Vec<FixtureEvent> = serde_json::from_str(&contents).map_err(|e| {
            StatusDetail::new(
                Code::Internal,
                format!("Invalid fixture file {}: {e}", path.display()),
            )
        })?;

        let events = entries
            .into_iter()
            .map(FixtureEvent::into_raw)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StatusDetail::new(Code::Internal, format!("{}: {e}", path.display())))?;

        info!("Loaded {} fixture event(s) for {topic} from {}", events.len(), path.display());
        Ok(events)
    }
}

/// Events strictly after `position`, and the head token to report once
/// they are exhausted.
fn events_after(
    events: Vec<RawEvent>,
    position: &ReplayPosition,
) -> Result<(VecDeque<RawEvent>, Option<ReplayToken>), StatusDetail> {
    let last_token = events.last().and_then(|e| e.replay_token.clone());
    match position {
        ReplayPosition::Earliest => Ok((events.into(), None)),
        ReplayPosition::Latest => Ok((VecDeque::new(), last_token)),
        ReplayPosition::Custom(token) => {
            match events.iter().position(|e| e.replay_token.as_ref() == Some(token)) {
                Some(index) => Ok((events.into_iter().skip(index + 1).collect(), Some(token.clone()))),
                None if events.is_empty() => Ok((VecDeque::new(), Some(token.clone()))),
                None => Err(StatusDetail::new(
                    Code::InvalidArgument,
                    format!("The replayId {} is not available", token.display_hint()),
                )
                .with_trailer(
                    "error-code",
                    "sfdc.platform.eventbus.grpc.subscription.fetch.replayid.corrupted",
                )),
            }
        }
    }
}

#[async_trait]
impl SubscribeTransport for FixtureTransport {
    fn endpoint(&self) -> String {
        format!("fixtures {}", self.dir.display())
    }

    async fn subscribe(&self, mut requests: RequestStream) -> Result<ResponseStream, StatusDetail> {
        let Some(initial) = requests.next().await else {
            return Ok(futures::stream::empty().boxed());
        };
        let position = initial
            .replay_position
            .clone()
            .unwrap_or(ReplayPosition::Latest);

        let events = self.load(&initial.topic).await?;
        let (pending, head) = events_after(events, &position)?;
        debug!(
            "Serving {} fixture event(s) for {} from {position}",
            pending.len(),
            initial.topic
        );

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(serve(requests, pending, initial.requested_count, head, tx));
        Ok(UnboundedReceiverStream::new(rx).boxed())
    }

    async fn topic_info(&self, topic: &str) -> Result<TopicInfo, StatusDetail> {
        let events = self.load(topic).await?;
        Ok(TopicInfo {
            topic_name: topic.to_string(),
            tenant_guid: "fixtures".to_string(),
            can_publish: false,
            can_subscribe: true,
            schema_id: events.first().map(|e| e.schema_id.clone()).unwrap_or_default(),
        })
    }
}

async fn serve(
    mut requests: RequestStream,
    mut pending: VecDeque<RawEvent>,
    mut credit: i32,
    mut head: Option<ReplayToken>,
    tx: mpsc::UnboundedSender<Result<FetchResponse, StatusDetail>>,
) {
    loop {
        while credit > 0 && !pending.is_empty() {
            let take = (credit as usize).min(pending.len());
            let events: Vec<RawEvent> = pending.drain(..take).collect();
            credit -= take as i32;
            if let Some(token) = events.last().and_then(|e| e.replay_token.clone()) {
                head = Some(token);
            }
            let response = FetchResponse {
                events,
                latest_replay_token: head.clone(),
                pending_credit: credit,
                rpc_id: None,
            };
            if tx.send(Ok(response)).is_err() {
                return;
            }
        }

        if pending.is_empty() {
            let caught_up = FetchResponse {
                events: Vec::new(),
                latest_replay_token: head.clone(),
                pending_credit: 0,
                rpc_id: None,
            };
            if tx.send(Ok(caught_up)).is_err() {
                return;
            }
            break;
        }

        match requests.next().await {
            Some(request) => credit += request.requested_count,
            None => return,
        }
    }

    while requests.next().await.is_some() {}
}
