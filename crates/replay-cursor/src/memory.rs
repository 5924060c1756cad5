//! In-memory cursor storage.

use anyhow::Result;
use async_trait::async_trait;
use pubsub_types::ReplayToken;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::store::CursorStore;

/// Process-local cursor store.
///
/// Nothing survives the process; used by tests and `--memory-cursors` runs.
#[derive(Default)]
pub struct MemoryStore {
    cursors: RwLock<HashMap<String, ReplayToken>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CursorStore for MemoryStore {
    async fn get(&self, topic: &str) -> Result<Option<ReplayToken>> {
        Ok(self.cursors.read().await.get(topic).cloned())
    }

    async fn set(&self, topic: &str, token: &ReplayToken) -> Result<()> {
        self.cursors
            .write()
            .await
            .insert(topic.to_string(), token.clone());
        Ok(())
    }
}
