//! Cursor inspection and seeding.
//!
//! CLI commands:
//! - `cursor show --topic /event/A__e`
//! - `cursor set --topic /event/A__e --token AAAAAAAAAB4=`

use anyhow::Context;
use pubsub_types::{validate_topic, ReplayToken};

use crate::StoreOpts;

/// The stored cursor for `topic`, if any.
pub async fn show(store: &StoreOpts, topic: &str) -> anyhow::Result<Option<ReplayToken>> {
    validate_topic(topic)?;
    store
        .storage()
        .open()
        .get(topic)
        .await
        .with_context(|| format!("Failed to read cursor for {topic}"))
}

/// Replace the stored cursor for `topic` with the base64 `token`.
///
/// Returns the previous value.
pub async fn set(store: &StoreOpts, topic: &str, token: &str) -> anyhow::Result<Option<ReplayToken>> {
    validate_topic(topic)?;
    let token = ReplayToken::from_cli_string(token)
        .with_context(|| format!("Invalid replay token '{token}': expected base64"))?;

    let cursors = store.storage().open();
    let previous = cursors
        .get(topic)
        .await
        .with_context(|| format!("Failed to read cursor for {topic}"))?;
    cursors
        .set(topic, &token)
        .await
        .with_context(|| format!("Failed to store cursor for {topic}"))?;

    tracing::info!(
        "Cursor for {topic} set to {} (was {})",
        token.display_hint(),
        previous
            .as_ref()
            .map(|t| t.display_hint())
            .unwrap_or_else(|| "unset".to_string())
    );
    Ok(previous)
}

/// One-line rendering: the human hint and the exact base64 bytes.
pub fn describe(token: &ReplayToken) -> String {
    format!("{} (base64 {})", token.display_hint(), token.to_cli_string())
}
