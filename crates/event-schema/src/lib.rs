//! Schema resolution and payload decoding for Pub/Sub events.
//!
//! Event payloads arrive as schemaless Avro binary. Each event names the
//! schema it was written with; this crate turns that id into a parsed schema
//! and decodes the payload into structured fields.
//!
//! Features:
//!
//! - Ordered fallback: schema retrieval tries a configured list of protocol
//!   variants (gRPC, REST API versions, local files) and keeps the first success
//! - Process-lifetime cache: schema ids are immutable upstream, so a resolved
//!   schema is never fetched twice
//! - Deterministic decoding: the same schema and payload always produce the
//!   same fields

/// Schema resolver with per-id cache
///
/// Owns the ordered list of fetchers and the cache of parsed schemas.
pub mod resolver;

/// Fetcher trait and the variants it can be configured with
pub mod fetcher;

/// Avro payload decoder
pub mod decoder;
pub mod error;
pub mod file;
pub mod rest;

pub use decoder::EventDecoder;
pub use error::{DecodeError, SchemaAttempt, SchemaUnavailableError};
pub use fetcher::{SchemaFetcher, SchemaVariant};
pub use file::FileSchemaFetcher;
pub use resolver::{SchemaHandle, SchemaResolver};
pub use rest::{RestSchemaFetcher, DEFAULT_API_VERSIONS};
