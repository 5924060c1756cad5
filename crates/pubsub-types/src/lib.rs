//! Shared types for the Pub/Sub poller.
//!
//! These types are used by every other crate in the workspace: the stream
//! session produces [`FetchResponse`]s of [`RawEvent`]s, the collector turns
//! them into [`DecodedEvent`]s, and the cursor store persists [`ReplayToken`]s.
//!
//! # Modules
//!
//! - [`replay`] - replay tokens and start positions
//! - [`fetch`] - request/response shapes of the bidirectional subscription
//! - [`event`] - raw wire events and decoded events handed to sinks
//! - [`error`] - error types for constructing the above

pub mod error;
pub mod event;
pub mod fetch;
pub mod replay;

pub use error::{Result, TypesError};
pub use event::{DecodedEvent, DecodedFields, RawEvent};
pub use fetch::{FetchRequest, FetchResponse, TopicInfo};
pub use replay::{ReplayPosition, ReplayToken};

/// Extract the event name from a topic path.
///
/// `/event/Delete_Logs__e` becomes `Delete_Logs__e`.
pub fn topic_event_name(topic: &str) -> &str {
    topic.rsplit('/').next().unwrap_or(topic)
}

/// Validate a topic name supplied by a caller.
pub fn validate_topic(topic: &str) -> Result<()> {
    if topic.trim().is_empty() {
        return Err(TypesError::EmptyTopic);
    }
    Ok(())
}
