//! Batch and continuous event collection from the Pub/Sub API.
//!
//! A batch run subscribes to each topic, collects up to `max_events` decoded
//! events within `max_wait`, hands them to an [`EventSink`](event_sink::EventSink)
//! and only then stores the topic's replay cursor. The next run resumes from
//! that cursor, so a process that starts, polls and exits sees every event
//! exactly once unless a sink write fails.
//!
//! Continuous mode keeps a single subscription open, requesting more events on
//! a fixed interval and persisting the cursor after each delivered response.

/// Bounded fetch cycle for one topic
pub mod collector;

/// Command-line configuration
pub mod config;
pub mod continuous;
pub mod duration;
pub mod error;
pub mod poller;
pub mod processor;

#[cfg(test)]
mod test_support;

pub use collector::{BatchCollector, BatchConfig, BatchOutcome, StopCause};
pub use config::Config;
pub use continuous::{run_continuous, ContinuousConfig, ContinuousSummary};
pub use duration::{parse_duration, parse_nonzero_duration};
pub use error::BatchError;
pub use poller::{poll_topic, run_batch, PollSummary, TopicReport};
pub use processor::{EventProcessor, SkipReason, SkippedEvent};
