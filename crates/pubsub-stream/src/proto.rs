//! Wire messages of the `eventbus.v1.PubSub` service.
//!
//! Declared by hand with prost derives; only the messages used by
//! `Subscribe`, `GetTopic` and `GetSchema` are included.

use pubsub_types::{RawEvent, ReplayPosition, ReplayToken};

pub const SUBSCRIBE_PATH: &str = "/eventbus.v1.PubSub/Subscribe";
pub const GET_TOPIC_PATH: &str = "/eventbus.v1.PubSub/GetTopic";
pub const GET_SCHEMA_PATH: &str = "/eventbus.v1.PubSub/GetSchema";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ReplayPreset {
    Latest = 0,
    Earliest = 1,
    Custom = 2,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FetchRequest {
    #[prost(string, tag = "1")]
    pub topic_name: String,
    #[prost(enumeration = "ReplayPreset", tag = "2")]
    pub replay_preset: i32,
    #[prost(bytes = "vec", tag = "3")]
    pub replay_id: Vec<u8>,
    #[prost(int32, tag = "4")]
    pub num_requested: i32,
    #[prost(string, tag = "5")]
    pub auth_refresh: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventHeader {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProducerEvent {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub schema_id: String,
    #[prost(bytes = "vec", tag = "3")]
    pub payload: Vec<u8>,
    #[prost(message, repeated, tag = "4")]
    pub headers: Vec<EventHeader>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConsumerEvent {
    #[prost(message, optional, tag = "1")]
    pub event: Option<ProducerEvent>,
    #[prost(bytes = "vec", tag = "2")]
    pub replay_id: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FetchResponse {
    #[prost(message, repeated, tag = "1")]
    pub events: Vec<ConsumerEvent>,
    #[prost(bytes = "vec", tag = "2")]
    pub latest_replay_id: Vec<u8>,
    #[prost(string, tag = "3")]
    pub rpc_id: String,
    #[prost(int32, tag = "4")]
    pub pending_num_requested: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TopicRequest {
    #[prost(string, tag = "1")]
    pub topic_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TopicInfo {
    #[prost(string, tag = "1")]
    pub topic_name: String,
    #[prost(string, tag = "2")]
    pub tenant_guid: String,
    #[prost(bool, tag = "3")]
    pub can_publish: bool,
    #[prost(bool, tag = "4")]
    pub can_subscribe: bool,
    #[prost(string, tag = "5")]
    pub schema_id: String,
    #[prost(string, tag = "6")]
    pub rpc_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SchemaRequest {
    #[prost(string, tag = "1")]
    pub schema_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SchemaInfo {
    #[prost(string, tag = "1")]
    pub schema_json: String,
    #[prost(string, tag = "2")]
    pub schema_id: String,
    #[prost(string, tag = "3")]
    pub rpc_id: String,
}

impl From<&pubsub_types::FetchRequest> for FetchRequest {
    /// Follow-up requests carry only the topic and the count.
    fn from(request: &pubsub_types::FetchRequest) -> Self {
        let mut wire = FetchRequest {
            topic_name: request.topic.clone(),
            num_requested: request.requested_count,
            ..Default::default()
        };
        match &request.replay_position {
            Some(ReplayPosition::Earliest) => wire.replay_preset = ReplayPreset::Earliest as i32,
            Some(ReplayPosition::Latest) => wire.replay_preset = ReplayPreset::Latest as i32,
            Some(ReplayPosition::Custom(token)) => {
                wire.replay_preset = ReplayPreset::Custom as i32;
                wire.replay_id = token.as_bytes().to_vec();
            }
            None => {}
        }
        wire
    }
}

impl From<ConsumerEvent> for RawEvent {
    fn from(wire: ConsumerEvent) -> Self {
        let replay_token = ReplayToken::new(wire.replay_id).ok();
        match wire.event {
            Some(event) => RawEvent {
                schema_id: event.schema_id,
                event_id: event.id,
                replay_token,
                payload: (!event.payload.is_empty()).then_some(event.payload),
            },
            None => RawEvent {
                replay_token,
                ..Default::default()
            },
        }
    }
}

impl From<FetchResponse> for pubsub_types::FetchResponse {
    fn from(wire: FetchResponse) -> Self {
        pubsub_types::FetchResponse {
            events: wire.events.into_iter().map(RawEvent::from).collect(),
            latest_replay_token: ReplayToken::new(wire.latest_replay_id).ok(),
            pending_credit: wire.pending_num_requested,
            rpc_id: (!wire.rpc_id.is_empty()).then_some(wire.rpc_id),
        }
    }
}

impl From<TopicInfo> for pubsub_types::TopicInfo {
    fn from(wire: TopicInfo) -> Self {
        pubsub_types::TopicInfo {
            topic_name: wire.topic_name,
            tenant_guid: wire.tenant_guid,
            can_publish: wire.can_publish,
            can_subscribe: wire.can_subscribe,
            schema_id: wire.schema_id,
        }
    }
}
