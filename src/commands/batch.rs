//! Batch handler.
//!
//! CLI command: `batch --topic /event/A__e,/event/B__e --max-events 100 --max-wait 60s`

use pubsub_source::{run_batch, BatchCollector, PollSummary};
use std::sync::Arc;
use tracing::info;

use crate::{build_resolver, connect_upstream, SourceArgs};

/// Poll every configured topic once.
///
/// Per-topic failures are reported in the returned summary; only setup
/// failures (connection, configuration) are returned as errors.
pub async fn run(args: SourceArgs) -> anyhow::Result<PollSummary> {
    let config = &args.config;
    info!(
        "Starting batch run for {} topic(s): max {} event(s), max wait {:?}",
        config.topics.len(),
        config.max_events,
        config.max_wait
    );

    let upstream = connect_upstream(&args.pubsub).await?;
    let resolver = build_resolver(
        &config.schema_versions,
        &args.pubsub,
        upstream.grpc.as_ref(),
        config.schema_timeout,
    )?;
    let cursors = args.store.storage().open();
    let sink = args.sink.build();

    let collector = BatchCollector::new(
        upstream.transport,
        cursors,
        Arc::new(resolver),
        config.batch_config(),
    );

    Ok(run_batch(
        &collector,
        sink.as_ref(),
        &config.topics,
        config.max_wait,
        config.max_events,
    )
    .await)
}
