//! Schema retrieval from local files, for offline runs.

use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;

use crate::fetcher::SchemaFetcher;

/// Reads `<dir>/<schema_id>.avsc`, falling back to `<dir>/<schema_id>.json`.
pub struct FileSchemaFetcher {
    dir: PathBuf,
}

impl FileSchemaFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SchemaFetcher for FileSchemaFetcher {
    fn variant(&self) -> String {
        format!("file {}", self.dir.display())
    }

    async fn fetch(&self, schema_id: &str) -> anyhow::Result<String> {
        if schema_id.contains(['/', '\\']) || schema_id.contains("..") {
            anyhow::bail!("Refusing schema id with path separators: {schema_id}");
        }

        for ext in ["avsc", "json"] {
            let path = self.dir.join(format!("{schema_id}.{ext}"));
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read schema file {}", path.display()));
            }
        }

        anyhow::bail!(
            "No {schema_id}.avsc or {schema_id}.json in {}",
            self.dir.display()
        )
    }
}
