//! Continuous subscription handler.
//!
//! CLI command: `subscribe --topic /event/A__e --fetch-interval 30s`

use pubsub_source::{run_continuous, ContinuousSummary, EventProcessor};
use std::future::Future;
use std::sync::Arc;

use crate::{build_resolver, connect_upstream, SourceArgs};

/// Subscribe to the single configured topic until `shutdown` resolves.
pub async fn run<F>(args: SourceArgs, shutdown: F) -> anyhow::Result<ContinuousSummary>
where
    F: Future<Output = ()>,
{
    let config = &args.config;
    let topic = match config.topics.as_slice() {
        [topic] => topic.clone(),
        topics => anyhow::bail!(
            "subscribe takes exactly one topic, got {}: {}",
            topics.len(),
            topics.join(", ")
        ),
    };

    tracing::info!("Starting continuous subscription to {topic}");
    if !args.store.storage().is_durable() {
        tracing::warn!("Cursors are kept in memory; a restart will begin from EARLIEST again");
    }

    let upstream = connect_upstream(&args.pubsub).await?;
    let resolver = build_resolver(
        &config.schema_versions,
        &args.pubsub,
        upstream.grpc.as_ref(),
        config.schema_timeout,
    )?;
    let cursors = args.store.storage().open();
    let sink = args.sink.build();
    let processor = EventProcessor::new(Arc::new(resolver));

    run_continuous(
        upstream.transport,
        cursors,
        &processor,
        sink.as_ref(),
        &topic,
        &config.continuous_config(),
        shutdown,
    )
    .await
}
