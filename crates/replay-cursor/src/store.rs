//! Cursor storage trait and types
//!
//! This module defines the CursorStore trait for backend-agnostic
//! replay cursor operations, plus the persisted record format.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pubsub_types::ReplayToken;
use serde::{Deserialize, Serialize};

/// Cursor record stored in a backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCursor {
    /// Topic this cursor belongs to, checked on read
    pub topic: String,
    /// Replay token, base64 encoded by its serde impl
    pub replay_token: ReplayToken,
    /// Timestamp when the cursor was written
    pub updated_at: DateTime<Utc>,
}

impl StoredCursor {
    pub fn new(topic: &str, token: &ReplayToken) -> Self {
        Self {
            topic: topic.to_string(),
            replay_token: token.clone(),
            updated_at: Utc::now(),
        }
    }
}

/// Trait for replay cursor storage operations.
///
/// Implementations must:
/// - return exactly the bytes last passed to `set` for a topic
/// - make `set` atomic with respect to crashes (old or new value, never a mix)
/// - serialize writes per topic
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Read the last persisted token for a topic.
    ///
    /// Returns None if the topic has never completed a batch.
    async fn get(&self, topic: &str) -> Result<Option<ReplayToken>>;

    /// Persist a token for a topic, replacing any prior value.
    async fn set(&self, topic: &str, token: &ReplayToken) -> Result<()>;
}
