use async_trait::async_trait;
use futures::stream::BoxStream;
use pubsub_types::{FetchRequest, FetchResponse, TopicInfo};

use crate::error::StatusDetail;

/// Outbound half of a subscription. Ending this stream half-closes the call.
pub type RequestStream = BoxStream<'static, FetchRequest>;

/// Inbound half of a subscription.
pub type ResponseStream = BoxStream<'static, Result<FetchResponse, StatusDetail>>;

/// A bidirectional subscription transport.
///
/// Implemented by the gRPC client, the fixture transport used for offline
/// runs, and the scripted transport used in tests.
#[async_trait]
pub trait SubscribeTransport: Send + Sync {
    /// Where this transport connects to, for logs.
    fn endpoint(&self) -> String;

    /// Start a subscription.
    ///
    /// The transport reads `requests` for as long as the call lives. When
    /// `requests` ends the peer finalizes the response stream, so callers
    /// must keep it open while they still want responses.
    async fn subscribe(&self, requests: RequestStream) -> Result<ResponseStream, StatusDetail>;

    async fn topic_info(&self, topic: &str) -> Result<TopicInfo, StatusDetail>;
}
