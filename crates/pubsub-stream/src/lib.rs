//! Subscription sessions for the Pub/Sub API.
//!
//! The subscription is a bidirectional stream: the client sends
//! `FetchRequest`s asking for credit, the server answers with
//! `FetchResponse`s carrying events. The outbound half has to stay open for
//! as long as responses are wanted; if it ends, the server ends the inbound
//! half without any error.
//!
//! Features:
//!
//! - Explicit outbound lifetime: [`StreamSession`] keeps the request stream
//!   open until `close` is called, either passively ([`Lifetime::Bounded`]) or
//!   with periodic follow-up requests ([`Lifetime::Unbounded`])
//! - Status classification: protocol statuses become typed [`SessionError`]s,
//!   and `CANCELLED` after a requested close is a clean shutdown
//! - Pluggable transports: gRPC with TLS, fixture files for offline runs, and
//!   a scripted transport for tests

/// Stream session state machine
///
/// Owns one subscription from `open` to `close`, with the outbound request
/// producer running as a background task.
pub mod session;

/// Transport abstraction the session runs on
pub mod transport;

/// gRPC transport and `GetSchema` fetcher
pub mod grpc;
pub mod error;
pub mod fixture;
pub mod proto;
pub mod testing;

pub use error::{classify_status, Result, SessionError, StatusDetail};
pub use fixture::FixtureTransport;
pub use grpc::{Credentials, GrpcSchemaFetcher, PubSubTransport, DEFAULT_ENDPOINT};
pub use session::{CloseReason, Lifetime, SessionState, StreamSession};
pub use transport::{RequestStream, ResponseStream, SubscribeTransport};
