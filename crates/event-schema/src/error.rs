use thiserror::Error;

/// One failed retrieval attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaAttempt {
    /// Variant name, e.g. `grpc`, `rest v64.0`, `file ./schemas`
    pub variant: String,
    pub reason: String,
}

/// Every configured variant failed to produce a usable schema.
#[derive(Error, Debug, Clone)]
#[error("Schema {schema_id} unavailable after {} attempt(s): {}", .attempts.len(), format_attempts(.attempts))]
pub struct SchemaUnavailableError {
    pub schema_id: String,
    pub attempts: Vec<SchemaAttempt>,
}

fn format_attempts(attempts: &[SchemaAttempt]) -> String {
    if attempts.is_empty() {
        return "no schema variants configured".to_string();
    }
    attempts
        .iter()
        .map(|a| format!("[{}] {}", a.variant, a.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Avro decode error for schema {schema_id}: {source}")]
    Avro {
        schema_id: String,
        #[source]
        source: apache_avro::Error,
    },

    #[error("Payload for schema {schema_id} ends before the record does")]
    Truncated { schema_id: String },

    #[error("Payload for schema {schema_id} has {remaining} trailing byte(s)")]
    TrailingBytes { schema_id: String, remaining: usize },

    #[error("Payload for schema {schema_id} is not a record")]
    NotARecord { schema_id: String },

    #[error("Value conversion error for schema {schema_id}: {message}")]
    Conversion { schema_id: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_unavailable_lists_attempts() {
        let err = SchemaUnavailableError {
            schema_id: "abc".to_string(),
            attempts: vec![
                SchemaAttempt {
                    variant: "rest v64.0".to_string(),
                    reason: "HTTP 404".to_string(),
                },
                SchemaAttempt {
                    variant: "rest v61.0".to_string(),
                    reason: "timeout".to_string(),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("Schema abc unavailable after 2 attempt(s)"));
        assert!(msg.contains("[rest v64.0] HTTP 404"));
        assert!(msg.contains("[rest v61.0] timeout"));
    }

    #[test]
    fn test_schema_unavailable_without_variants() {
        let err = SchemaUnavailableError {
            schema_id: "abc".to_string(),
            attempts: Vec::new(),
        };
        assert!(err.to_string().contains("no schema variants configured"));
    }
}
