use pubsub_types::TypesError;
use thiserror::Error;
use tonic::metadata::KeyAndValueRef;
use tonic::Code;

/// A protocol status with its diagnostic trailers.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusDetail {
    pub code: Code,
    pub message: String,
    /// ASCII trailer metadata, e.g. `error-code`
    pub trailers: Vec<(String, String)>,
}

impl StatusDetail {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            trailers: Vec::new(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(Code::Cancelled, "Cancelled by client")
    }

    pub fn with_trailer(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.trailers.push((key.into(), value.into()));
        self
    }

    pub fn trailer(&self, key: &str) -> Option<&str> {
        self.trailers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the message or any trailer refers to the replay id.
    pub fn mentions_replay_id(&self) -> bool {
        let mentions = |text: &str| {
            let text = text.to_ascii_lowercase();
            text.contains("replayid") || text.contains("replay id") || text.contains("replay_id")
        };
        mentions(&self.message) || self.trailers.iter().any(|(_, v)| mentions(v))
    }
}

impl std::fmt::Display for StatusDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)?;
        for (key, value) in &self.trailers {
            write!(f, " [{key}={value}]")?;
        }
        Ok(())
    }
}

impl From<tonic::Status> for StatusDetail {
    fn from(status: tonic::Status) -> Self {
        let trailers = status
            .metadata()
            .iter()
            .filter_map(|entry| match entry {
                KeyAndValueRef::Ascii(key, value) => value
                    .to_str()
                    .ok()
                    .map(|v| (key.as_str().to_string(), v.to_string())),
                KeyAndValueRef::Binary(..) => None,
            })
            .collect();

        Self {
            code: status.code(),
            message: status.message().to_string(),
            trailers,
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to connect to {target}: {message}")]
    Connect { target: String, message: String },

    #[error("Topic {topic} not found or not subscribable: {message}")]
    NotFound { topic: String, message: String },

    #[error("Replay token rejected for {topic}: {status}")]
    ReplayTokenInvalid { topic: String, status: StatusDetail },

    #[error("Stream for {topic} closed unexpectedly after {responses_received} response(s)")]
    StreamClosedUnexpectedly {
        topic: String,
        responses_received: usize,
    },

    #[error("Transport error: {0}")]
    Transport(StatusDetail),

    #[error("Cannot {operation} a session in state {state}")]
    InvalidState {
        state: String,
        operation: &'static str,
    },

    #[error("Requested event count must be positive, got {0}")]
    InvalidCredit(i32),

    #[error("Follow-up request interval must be non-zero")]
    InvalidInterval,

    #[error(transparent)]
    InvalidRequest(#[from] TypesError),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Map a protocol status onto the session error taxonomy.
///
/// Auth and availability failures only count as connect errors while the
/// stream is being established; once responses have flowed they are
/// transport errors.
pub fn classify_status(topic: &str, status: StatusDetail, before_first_response: bool) -> SessionError {
    match status.code {
        Code::NotFound => SessionError::NotFound {
            topic: topic.to_string(),
            message: status.message,
        },
        Code::InvalidArgument | Code::FailedPrecondition if status.mentions_replay_id() => {
            SessionError::ReplayTokenInvalid {
                topic: topic.to_string(),
                status,
            }
        }
        Code::Unauthenticated | Code::PermissionDenied | Code::Unavailable
            if before_first_response =>
        {
            SessionError::Connect {
                target: topic.to_string(),
                message: status.to_string(),
            }
        }
        _ => SessionError::Transport(status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found() {
        let err = classify_status("/event/X__e", StatusDetail::new(Code::NotFound, "no topic"), true);
        assert!(matches!(err, SessionError::NotFound { .. }));
    }

    #[test]
    fn test_replay_id_rejection_from_trailer() {
        let status = StatusDetail::new(Code::InvalidArgument, "The request is invalid")
            .with_trailer(
                "error-code",
                "sfdc.platform.eventbus.grpc.subscription.fetch.replayid.corrupted",
            );
        let err = classify_status("/event/X__e", status, true);
        assert!(matches!(err, SessionError::ReplayTokenInvalid { .. }));
    }

    #[test]
    fn test_invalid_argument_without_replay_id_is_transport() {
        let status = StatusDetail::new(Code::InvalidArgument, "bad num_requested");
        let err = classify_status("/event/X__e", status, true);
        assert!(matches!(err, SessionError::Transport(_)));
    }

    #[test]
    fn test_auth_failure_only_connect_before_first_response() {
        let status = StatusDetail::new(Code::Unauthenticated, "session expired");
        assert!(matches!(
            classify_status("/event/X__e", status.clone(), true),
            SessionError::Connect { .. }
        ));
        assert!(matches!(
            classify_status("/event/X__e", status, false),
            SessionError::Transport(_)
        ));
    }

    #[test]
    fn test_status_conversion_keeps_trailers() {
        let mut status = tonic::Status::new(Code::FailedPrecondition, "Replay ID not available");
        status
            .metadata_mut()
            .insert("error-code", "replay.unavailable".parse().unwrap());

        let detail = StatusDetail::from(status);
        assert_eq!(detail.code, Code::FailedPrecondition);
        assert_eq!(detail.trailer("error-code"), Some("replay.unavailable"));
        assert!(detail.mentions_replay_id());
        assert!(detail.to_string().contains("[error-code=replay.unavailable]"));
    }
}
