//! Request and response shapes of the bidirectional subscription.
//!
//! These are transport-neutral: the gRPC transport converts them to and from
//! the wire messages, and the mock transports use them directly.

use crate::event::RawEvent;
use crate::replay::{ReplayPosition, ReplayToken};

/// A client-to-server request on the subscription stream.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub topic: String,
    /// Start position. Only the first request of a stream carries one;
    /// follow-up requests only add credit.
    pub replay_position: Option<ReplayPosition>,
    /// Number of additional events the client is willing to receive.
    pub requested_count: i32,
}

impl FetchRequest {
    /// The first request of a stream.
    pub fn initial(topic: &str, position: ReplayPosition, requested_count: i32) -> Self {
        Self {
            topic: topic.to_string(),
            replay_position: Some(position),
            requested_count,
        }
    }

    /// A follow-up request for more credit on an already open stream.
    pub fn more(topic: &str, requested_count: i32) -> Self {
        Self {
            topic: topic.to_string(),
            replay_position: None,
            requested_count,
        }
    }

    pub fn is_initial(&self) -> bool {
        self.replay_position.is_some()
    }
}

/// A server-to-client response on the subscription stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchResponse {
    /// Events in delivery order.
    pub events: Vec<RawEvent>,
    /// Position after the last event in this response, or the current head
    /// of the topic for keepalive responses.
    pub latest_replay_token: Option<ReplayToken>,
    /// Events the server will still deliver without another request.
    pub pending_credit: i32,
    /// Server-side correlation id, for support tickets.
    pub rpc_id: Option<String>,
}

impl FetchResponse {
    /// A response with no events is either a keepalive or a caught-up marker.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// No events and no credit left: nothing more right now.
    pub fn is_caught_up(&self) -> bool {
        self.events.is_empty() && self.pending_credit == 0
    }
}

/// Topic metadata returned by the topic lookup call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TopicInfo {
    pub topic_name: String,
    pub tenant_guid: String,
    pub can_publish: bool,
    pub can_subscribe: bool,
    /// Schema id of the topic's current schema.
    pub schema_id: String,
}
