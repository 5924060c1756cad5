//! JSON Lines file sink.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use pubsub_types::{topic_event_name, DecodedEvent};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::traits::EventSink;

/// Writes each batch to its own `events_{timestamp}_{topic}.jsonl` file.
///
/// Files are written to a temporary name in the output directory and renamed
/// into place, so a reader never sees a partially written batch.
pub struct JsonlFileSink {
    dir: PathBuf,
}

impl JsonlFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(topic: &str) -> String {
        let slug: String = topic_event_name(topic)
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        let ts = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        format!("events_{ts}_{slug}.jsonl")
    }
}

#[async_trait]
impl EventSink for JsonlFileSink {
    async fn write_events(&self, topic: &str, events: &[DecodedEvent]) -> Result<()> {
        if events.is_empty() {
            tracing::debug!("No events for {topic}, nothing written");
            return Ok(());
        }

        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create output directory {}", self.dir.display()))?;

        let path = self.dir.join(Self::file_name(topic));
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .context("Failed to create temporary output file")?;
        {
            let mut writer = std::io::BufWriter::new(tmp.as_file_mut());
            for event in events {
                serde_json::to_writer(&mut writer, event)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist_noclobber(&path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to move output file into {}", path.display()))?;

        tracing::info!("Wrote {} event(s) for {topic} to {}", events.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubsub_types::{DecodedFields, ReplayToken};

    fn event(id: &str) -> DecodedEvent {
        let mut fields = DecodedFields::new();
        fields.insert("Id".to_string(), serde_json::json!(id));
        DecodedEvent {
            topic: "/event/Order__e".to_string(),
            schema_id: "schema-1".to_string(),
            event_id: id.to_string(),
            replay_token: Some(ReplayToken::new(id.as_bytes().to_vec()).unwrap()),
            fields,
            decoded_at: Utc::now(),
        }
    }

    fn output_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        files
    }

    #[tokio::test]
    async fn test_writes_one_line_per_event() {
        let tmp = tempfile::TempDir::new().unwrap();
        let sink = JsonlFileSink::new(tmp.path().join("out"));

        sink.write_events("/event/Order__e", &[event("a"), event("b")])
            .await
            .unwrap();

        let files = output_files(sink.dir());
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("events_"));
        assert!(name.ends_with("_Order__e.jsonl"));

        let content = std::fs::read_to_string(&files[0]).unwrap();
        let lines: Vec<DecodedEvent> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].event_id, "a");
        assert_eq!(lines[1].event_id, "b");
    }

    #[tokio::test]
    async fn test_empty_batch_writes_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let sink = JsonlFileSink::new(tmp.path());

        sink.write_events("/event/Order__e", &[]).await.unwrap();
        assert!(output_files(tmp.path()).is_empty());
    }
}
