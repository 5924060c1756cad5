//! Subcommand handlers.
//!
//! - `batch`: one bounded fetch per topic, then exit
//! - `subscribe`: a long-lived subscription until Ctrl+C or SIGTERM
//! - `topic`: look a topic up
//! - `cursor`: inspect or seed stored replay cursors

pub mod batch;
pub mod cursor;
pub mod subscribe;
pub mod topic;
