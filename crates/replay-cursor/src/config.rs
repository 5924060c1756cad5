//! Cursor storage configuration.

use std::sync::Arc;

use crate::{CursorStore, FilesystemStore, MemoryStore};

/// Where replay cursors are kept.
#[derive(Debug, Clone, PartialEq)]
pub enum CursorStorage {
    /// One JSON file per topic under `dir`.
    Filesystem { dir: String },
    /// Process memory only.
    Memory,
}

impl Default for CursorStorage {
    fn default() -> Self {
        Self::Filesystem {
            dir: "data".to_string(),
        }
    }
}

impl CursorStorage {
    /// Build the configured store.
    pub fn open(&self) -> Arc<dyn CursorStore> {
        match self {
            CursorStorage::Filesystem { dir } => {
                tracing::info!("Using filesystem cursor store at {dir}");
                Arc::new(FilesystemStore::new(dir.clone()))
            }
            CursorStorage::Memory => {
                tracing::warn!("Using in-memory cursor store; cursors will not survive this run");
                Arc::new(MemoryStore::new())
            }
        }
    }

    /// Whether cursors written through this storage outlive the process.
    pub fn is_durable(&self) -> bool {
        matches!(self, CursorStorage::Filesystem { .. })
    }
}
