//! Filesystem-based cursor storage implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use pubsub_types::ReplayToken;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::store::{CursorStore, StoredCursor};

/// Filesystem implementation of CursorStore trait.
///
/// Stores one JSON file per topic in a directory. A write goes to a temporary
/// file in the same directory which is then renamed over the cursor file, so
/// a crash leaves either the previous or the new cursor, never a torn one.
pub struct FilesystemStore {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FilesystemStore {
    /// Create a new FilesystemStore with the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Get the directory path.
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Path of the cursor file for a topic.
    ///
    /// Topic names contain slashes, so the file name uses the URL-safe
    /// base64 form of the topic.
    pub fn path_for(&self, topic: &str) -> PathBuf {
        let encoded = general_purpose::URL_SAFE_NO_PAD.encode(topic.as_bytes());
        self.dir.join(format!("cursor_{encoded}.json"))
    }

    async fn topic_lock(&self, topic: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(topic.to_string()).or_default())
    }
}

#[async_trait]
impl CursorStore for FilesystemStore {
    async fn get(&self, topic: &str) -> Result<Option<ReplayToken>> {
        let path = self.path_for(topic);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read cursor file {}", path.display()))
            }
        };

        let stored: StoredCursor = serde_json::from_str(&content)
            .with_context(|| format!("Corrupt cursor file {}", path.display()))?;

        if stored.topic != topic {
            anyhow::bail!(
                "Cursor file {} belongs to topic '{}', expected '{}'",
                path.display(),
                stored.topic,
                topic
            );
        }

        Ok(Some(stored.replay_token))
    }

    async fn set(&self, topic: &str, token: &ReplayToken) -> Result<()> {
        let lock = self.topic_lock(topic).await;
        let _guard = lock.lock().await;

        std::fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create cursor directory {}", self.dir.display())
        })?;

        let stored = StoredCursor::new(topic, token);
        let path = self.path_for(topic);

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .context("Failed to create temporary cursor file")?;
        serde_json::to_writer_pretty(&mut tmp, &stored)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to replace cursor file {}", path.display()))?;
        sync_dir(&self.dir)?;

        tracing::debug!(
            "Stored cursor for {} at {}: {}",
            topic,
            path.display(),
            token.display_hint()
        );
        Ok(())
    }
}

/// Flush the directory entry so a completed rename survives a crash.
#[cfg(unix)]
pub(crate) fn sync_dir(dir: &Path) -> Result<()> {
    std::fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .with_context(|| format!("Failed to sync cursor directory {}", dir.display()))
}

#[cfg(not(unix))]
pub(crate) fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
