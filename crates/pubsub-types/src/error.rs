//! Error types for pubsub-types crate.

use thiserror::Error;

/// Errors that can occur while constructing shared types.
#[derive(Error, Debug)]
pub enum TypesError {
    #[error("Replay token cannot be empty")]
    EmptyReplayToken,

    #[error("Topic name cannot be empty")]
    EmptyTopic,

    #[error("Invalid base64 replay token: {0}")]
    InvalidTokenEncoding(String),
}

/// Result type alias for pubsub-types operations.
pub type Result<T> = std::result::Result<T, TypesError>;
