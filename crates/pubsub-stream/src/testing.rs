//! Scripted in-memory transport for tests.
//!
//! Behaves like the real service with respect to the outbound half: if the
//! client's request stream ends, the response stream ends too, silently. A
//! client that lets its request stream finish early therefore observes an
//! empty response sequence, while a client that keeps it open gets every
//! scripted response.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use pubsub_types::{FetchRequest, FetchResponse, ReplayPosition, TopicInfo};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tonic::Code;

use crate::error::StatusDetail;
use crate::transport::{RequestStream, ResponseStream, SubscribeTransport};

/// Window in which an ended outbound stream is noticed before each response.
const OUTBOUND_GRACE: Duration = Duration::from_millis(10);

pub enum ScriptStep {
    /// Deliver a response, unless the outbound stream has ended.
    Respond(FetchResponse),
    /// Fail the call with a status.
    Fail(StatusDetail),
    /// Wait, still noticing requests and outbound closure.
    Pause(Duration),
    /// Wait for the next client request.
    AwaitRequest,
    /// End the response stream from the server side.
    End,
}

type Script = Arc<dyn Fn(&ReplayPosition) -> Vec<ScriptStep> + Send + Sync>;

pub struct ScriptedTransport {
    scripts: HashMap<String, Script>,
    open_errors: HashMap<String, StatusDetail>,
    unsubscribable: HashSet<String>,
    cancel_on_close: bool,
    requests: Arc<Mutex<Vec<FetchRequest>>>,
    subscriptions: AtomicUsize,
    outbound_ended: Arc<watch::Sender<usize>>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        let (outbound_ended, _) = watch::channel(0);
        Self {
            scripts: HashMap::new(),
            open_errors: HashMap::new(),
            unsubscribable: HashSet::new(),
            cancel_on_close: false,
            requests: Arc::new(Mutex::new(Vec::new())),
            subscriptions: AtomicUsize::new(0),
            outbound_ended: Arc::new(outbound_ended),
        }
    }

    /// Script the responses for `topic`, chosen by the requested start position.
    pub fn with_topic<F>(mut self, topic: &str, script: F) -> Self
    where
        F: Fn(&ReplayPosition) -> Vec<ScriptStep> + Send + Sync + 'static,
    {
        self.scripts.insert(topic.to_string(), Arc::new(script));
        self
    }

    /// Fail `subscribe` and `topic_info` for `topic` with `status`.
    pub fn with_open_error(mut self, topic: &str, status: StatusDetail) -> Self {
        self.open_errors.insert(topic.to_string(), status);
        self
    }

    /// Report `can_subscribe == false` for `topic`.
    pub fn with_unsubscribable_topic(mut self, topic: &str) -> Self {
        self.unsubscribable.insert(topic.to_string());
        self
    }

    /// Finish calls with `CANCELLED` once the client half-closes.
    pub fn with_cancel_on_close(mut self) -> Self {
        self.cancel_on_close = true;
        self
    }

    /// Every request received, across all subscriptions, in arrival order.
    pub fn requests(&self) -> Vec<FetchRequest> {
        lock(&self.requests).clone()
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    /// Number of subscriptions whose outbound stream has ended.
    pub fn outbound_ended(&self) -> usize {
        *self.outbound_ended.borrow()
    }

    /// Wait until some subscription's outbound stream has ended.
    pub async fn wait_for_outbound_end(&self) {
        let mut ended = self.outbound_ended.subscribe();
        let _ = ended.wait_for(|count| *count > 0).await;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl SubscribeTransport for ScriptedTransport {
    fn endpoint(&self) -> String {
        "scripted".to_string()
    }

    async fn subscribe(&self, mut requests: RequestStream) -> Result<ResponseStream, StatusDetail> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);

        let Some(initial) = requests.next().await else {
            self.outbound_ended.send_modify(|count| *count += 1);
            return Ok(stream::empty().boxed());
        };
        lock(&self.requests).push(initial.clone());

        if let Some(status) = self.open_errors.get(&initial.topic) {
            return Err(status.clone());
        }
        let Some(script) = self.scripts.get(&initial.topic) else {
            return Err(StatusDetail::new(
                Code::NotFound,
                format!("Topic {} does not exist", initial.topic),
            ));
        };

        let position = initial
            .replay_position
            .clone()
            .unwrap_or(ReplayPosition::Latest);
        let steps = script(&position);

        let (responses, inbound) = mpsc::unbounded_channel();
        let runner = ScriptRunner {
            requests,
            log: Arc::clone(&self.requests),
            responses,
            cancel_on_close: self.cancel_on_close,
            outbound_ended: Arc::clone(&self.outbound_ended),
        };
        tokio::spawn(runner.run(steps));

        Ok(UnboundedReceiverStream::new(inbound).boxed())
    }

    async fn topic_info(&self, topic: &str) -> Result<TopicInfo, StatusDetail> {
        if let Some(status) = self.open_errors.get(topic) {
            return Err(status.clone());
        }
        if !self.scripts.contains_key(topic) {
            return Err(StatusDetail::new(
                Code::NotFound,
                format!("Topic {topic} does not exist"),
            ));
        }
        Ok(TopicInfo {
            topic_name: topic.to_string(),
            tenant_guid: "scripted-tenant".to_string(),
            can_publish: true,
            can_subscribe: !self.unsubscribable.contains(topic),
            schema_id: String::new(),
        })
    }
}

struct ScriptRunner {
    requests: RequestStream,
    log: Arc<Mutex<Vec<FetchRequest>>>,
    responses: mpsc::UnboundedSender<Result<FetchResponse, StatusDetail>>,
    cancel_on_close: bool,
    outbound_ended: Arc<watch::Sender<usize>>,
}

impl ScriptRunner {
    async fn run(mut self, steps: Vec<ScriptStep>) {
        for step in steps {
            match step {
                ScriptStep::Respond(response) => {
                    if self.outbound_ended_within(OUTBOUND_GRACE).await {
                        return;
                    }
                    if self.responses.send(Ok(response)).is_err() {
                        return;
                    }
                }
                ScriptStep::Fail(status) => {
                    let _ = self.responses.send(Err(status));
                    return;
                }
                ScriptStep::Pause(duration) => {
                    let deadline = Instant::now() + duration;
                    loop {
                        tokio::select! {
                            _ = tokio::time::sleep_until(deadline) => break,
                            request = self.requests.next() => match request {
                                Some(request) => self.record(request),
                                None => {
                                    self.half_closed();
                                    return;
                                }
                            },
                        }
                    }
                }
                ScriptStep::AwaitRequest => match self.requests.next().await {
                    Some(request) => self.record(request),
                    None => {
                        self.half_closed();
                        return;
                    }
                },
                ScriptStep::End => return,
            }
        }

        // script exhausted: stay open until the client half-closes
        while let Some(request) = self.requests.next().await {
            self.record(request);
        }
        self.half_closed();
    }

    async fn outbound_ended_within(&mut self, grace: Duration) -> bool {
        loop {
            match tokio::time::timeout(grace, self.requests.next()).await {
                Err(_) => return false,
                Ok(Some(request)) => self.record(request),
                Ok(None) => {
                    self.half_closed();
                    return true;
                }
            }
        }
    }

    fn record(&self, request: FetchRequest) {
        lock(&self.log).push(request);
    }

    fn half_closed(&self) {
        self.outbound_ended.send_modify(|count| *count += 1);
        if self.cancel_on_close {
            let _ = self.responses.send(Err(StatusDetail::cancelled()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOPIC: &str = "/event/Test__e";

    #[tokio::test]
    async fn test_ended_outbound_yields_empty_sequence() {
        let transport = ScriptedTransport::new().with_topic(TOPIC, |_| {
            vec![ScriptStep::Respond(FetchResponse {
                pending_credit: 0,
                ..Default::default()
            })]
        });

        // one request, then the outbound stream is finished
        let requests = stream::iter(vec![FetchRequest::initial(
            TOPIC,
            ReplayPosition::Earliest,
            10,
        )])
        .boxed();
        let responses: Vec<_> = transport.subscribe(requests).await.unwrap().collect().await;

        assert!(responses.is_empty());
        assert_eq!(transport.outbound_ended(), 1);
    }

    #[tokio::test]
    async fn test_open_outbound_receives_responses() {
        let transport = ScriptedTransport::new().with_topic(TOPIC, |_| {
            vec![ScriptStep::Respond(FetchResponse::default())]
        });
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(FetchRequest::initial(TOPIC, ReplayPosition::Earliest, 10))
            .unwrap();

        let mut responses = transport
            .subscribe(UnboundedReceiverStream::new(rx).boxed())
            .await
            .unwrap();
        assert!(responses.next().await.unwrap().is_ok());

        drop(tx);
        assert!(responses.next().await.is_none());
    }

    #[tokio::test]
    async fn test_script_sees_start_position() {
        let transport = ScriptedTransport::new().with_topic(TOPIC, |position| match position {
            ReplayPosition::Custom(_) => vec![ScriptStep::Fail(StatusDetail::new(
                Code::InvalidArgument,
                "replayId is invalid",
            ))],
            _ => vec![],
        });
        let token = pubsub_types::ReplayToken::new(vec![9]).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(FetchRequest::initial(TOPIC, ReplayPosition::Custom(token), 10))
            .unwrap();

        let mut responses = transport
            .subscribe(UnboundedReceiverStream::new(rx).boxed())
            .await
            .unwrap();
        let status = responses.next().await.unwrap().unwrap_err();
        assert_eq!(status.code, Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_topic_info() {
        let transport = ScriptedTransport::new()
            .with_topic(TOPIC, |_| vec![])
            .with_topic("/event/Locked__e", |_| vec![])
            .with_unsubscribable_topic("/event/Locked__e");

        assert!(transport.topic_info(TOPIC).await.unwrap().can_subscribe);
        assert!(!transport.topic_info("/event/Locked__e").await.unwrap().can_subscribe);
        assert_eq!(
            transport.topic_info("/event/Missing__e").await.unwrap_err().code,
            Code::NotFound
        );
    }
}
