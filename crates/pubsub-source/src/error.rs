use pubsub_stream::SessionError;
use thiserror::Error;

/// Errors that abort a batch. The cursor must not advance after one.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Failed to read cursor for {topic}: {message}")]
    Cursor { topic: String, message: String },

    #[error("Invalid batch parameters: {0}")]
    InvalidArgs(String),
}

impl From<pubsub_types::TypesError> for BatchError {
    fn from(err: pubsub_types::TypesError) -> Self {
        BatchError::Session(SessionError::from(err))
    }
}
