//! Replay cursor management for the Pub/Sub poller
//!
//! Persists the last successfully observed replay token per topic so that a
//! process which starts, fetches a bounded batch and exits resumes exactly
//! where the previous run stopped.
//!
//! # Architecture
//!
//! - `CursorStore` trait: `get(topic)` / `set(topic, token)` over opaque bytes
//! - `StoredCursor`: the persisted record (topic, base64 token, timestamp)
//! - `CursorStorage`: configuration selecting a backend
//!
//! ## Storage Backends
//!
//! - `FilesystemStore` - One JSON file per topic, replaced atomically
//! - `MemoryStore` - Process-local map, for tests and dry runs
//!
//! Tokens are never interpreted. The base64 encoding in persisted files is a
//! lossless container; `get` returns the exact bytes given to `set`.

mod config;
mod filesystem;
mod memory;
pub mod store;

#[cfg(test)]
mod tests;

pub use config::CursorStorage;
pub use filesystem::FilesystemStore;
pub use memory::MemoryStore;
pub use store::{CursorStore, StoredCursor};
