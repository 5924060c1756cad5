//! Downstream sink abstraction.
//!
//! This crate defines the `EventSink` trait that the poller hands decoded
//! events to. Success from the sink is the signal that the replay cursor may
//! advance; a failed write leaves the cursor where it was, so the events are
//! fetched again on the next run.

mod jsonl;
mod memory;
mod traits;

pub use jsonl::JsonlFileSink;
pub use memory::{DryRunSink, RecordingSink};
pub use traits::EventSink;
