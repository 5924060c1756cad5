//! pubsub-poller library
//!
//! Durable, replay-capable consumer for the Salesforce Pub/Sub API.
//!
//! # Features
//!
//! - Batch polling: fetch a bounded batch per topic, hand it to a sink, then
//!   persist the replay cursor so the next run resumes exactly there
//! - Continuous subscription: one long-lived stream with periodic credit
//!   requests, stopped by Ctrl+C or SIGTERM
//! - Schema fallback: gRPC `GetSchema`, several REST API versions, or local
//!   `.avsc` files, tried in order and cached per process
//! - Offline mode: serve events from fixture files instead of the API
//!
//! # Crates
//!
//! - `pubsub_types` - replay tokens, fetch requests and responses, events
//! - `replay_cursor` - per-topic cursor persistence
//! - `event_schema` - schema resolution and Avro decoding
//! - `pubsub_stream` - subscription sessions and transports
//! - `event_sink` - downstream sinks
//! - `pubsub_source` - batch collector, poller and continuous subscriber
//!
//! # CLI Usage
//!
//! ```bash
//! # One batch per topic, then exit
//! pubsub-poller batch --topic /event/Order_Event__e --max-events 500 --max-wait 2m
//!
//! # Keep a subscription open until interrupted
//! pubsub-poller subscribe --topic /event/Order_Event__e --fetch-interval 30s
//!
//! # Offline run against fixture files
//! pubsub-poller batch --fixtures-dir ./demos/mock --schema-versions file:./demos/schemas \
//!   --topic /event/Order_Event__e
//! ```

use clap::{Args, Parser};
use event_schema::{FileSchemaFetcher, RestSchemaFetcher, SchemaFetcher, SchemaResolver, SchemaVariant};
use event_sink::{DryRunSink, EventSink, JsonlFileSink};
use pubsub_stream::{
    Credentials, FixtureTransport, GrpcSchemaFetcher, PubSubTransport, SubscribeTransport,
    DEFAULT_ENDPOINT,
};
use replay_cursor::CursorStorage;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub mod commands;

/// Pub/Sub API connection options
#[derive(Parser, Clone, Debug)]
pub struct PubSubOpts {
    /// Pub/Sub API gRPC endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT, env = "PUBSUB_ENDPOINT")]
    pub endpoint: String,

    /// OAuth access token
    #[arg(long, env = "SF_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Salesforce instance URL, e.g. https://example.my.salesforce.com
    #[arg(long, env = "SF_INSTANCE_URL")]
    pub instance_url: Option<String>,

    /// Org ID
    #[arg(long, env = "SF_TENANT_ID")]
    pub tenant_id: Option<String>,

    /// Serve events from `<dir>/<event_name>.json` instead of the API
    #[arg(long, env = "MOCK_DATA_DIR")]
    pub fixtures_dir: Option<PathBuf>,
}

impl PubSubOpts {
    pub fn is_offline(&self) -> bool {
        self.fixtures_dir.is_some()
    }

    pub fn credentials(&self) -> anyhow::Result<Credentials> {
        let require = |value: &Option<String>, flag: &str| {
            value
                .clone()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("{flag} is required unless --fixtures-dir is set"))
        };
        Ok(Credentials {
            access_token: require(&self.access_token, "--access-token")?,
            instance_url: require(&self.instance_url, "--instance-url")?,
            tenant_id: require(&self.tenant_id, "--tenant-id")?,
        })
    }
}

/// Cursor storage options
#[derive(Parser, Clone, Debug)]
pub struct StoreOpts {
    /// Directory holding one cursor file per topic
    #[arg(long, default_value = "data", env = "CURSOR_DIR")]
    pub cursor_dir: String,

    /// Keep cursors in memory only (nothing survives the run)
    #[arg(long)]
    pub memory_cursors: bool,
}

impl StoreOpts {
    pub fn storage(&self) -> CursorStorage {
        if self.memory_cursors {
            CursorStorage::Memory
        } else {
            CursorStorage::Filesystem {
                dir: self.cursor_dir.clone(),
            }
        }
    }
}

/// Downstream sink options
#[derive(Parser, Clone, Debug)]
pub struct SinkOpts {
    /// Directory receiving `events_*.jsonl` files
    #[arg(long, default_value = "data", env = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Dry run mode - log events instead of writing them
    #[arg(long)]
    pub dry_run: bool,
}

impl SinkOpts {
    pub fn build(&self) -> Box<dyn EventSink> {
        if self.dry_run {
            info!("Running in dry-run mode - no events will be written");
            Box::new(DryRunSink)
        } else {
            info!("Writing events to {}", self.output_dir.display());
            Box::new(JsonlFileSink::new(self.output_dir.clone()))
        }
    }
}

/// Arguments shared by `batch` and `subscribe`.
#[derive(Args, Clone, Debug)]
pub struct SourceArgs {
    #[command(flatten)]
    pub pubsub: PubSubOpts,

    #[command(flatten)]
    pub store: StoreOpts,

    #[command(flatten)]
    pub sink: SinkOpts,

    #[command(flatten)]
    pub config: pubsub_source::Config,
}

/// A subscription transport plus, when talking to the real API, the gRPC
/// client the `grpc` schema variant shares.
pub struct Upstream {
    pub transport: Arc<dyn SubscribeTransport>,
    pub grpc: Option<PubSubTransport>,
}

/// Connect to the API, or open the fixture directory in offline mode.
pub async fn connect_upstream(opts: &PubSubOpts) -> anyhow::Result<Upstream> {
    if let Some(dir) = &opts.fixtures_dir {
        info!("Offline mode: serving events from {}", dir.display());
        return Ok(Upstream {
            transport: Arc::new(FixtureTransport::new(dir.clone())),
            grpc: None,
        });
    }

    let transport = PubSubTransport::connect(&opts.endpoint, opts.credentials()?).await?;
    Ok(Upstream {
        transport: Arc::new(transport.clone()),
        grpc: Some(transport),
    })
}

/// Build the schema fetchers for `variants`, in order.
///
/// Variants that cannot work in the current mode are skipped with a warning.
/// In offline mode with no `file:` variant, the fixture directory itself is
/// searched for `.avsc` files.
pub fn build_resolver(
    variants: &[SchemaVariant],
    opts: &PubSubOpts,
    grpc: Option<&PubSubTransport>,
    timeout: Duration,
) -> anyhow::Result<SchemaResolver> {
    let mut fetchers: Vec<Arc<dyn SchemaFetcher>> = Vec::new();

    for variant in variants {
        match variant {
            SchemaVariant::Grpc => match grpc {
                Some(transport) => {
                    fetchers.push(Arc::new(GrpcSchemaFetcher::new(transport.clone())));
                }
                None => warn!("Skipping schema variant {variant}: no gRPC connection"),
            },
            SchemaVariant::Rest(version) => match (&opts.instance_url, &opts.access_token) {
                (Some(instance_url), Some(access_token)) if !opts.is_offline() => {
                    fetchers.push(Arc::new(RestSchemaFetcher::new(
                        instance_url,
                        access_token,
                        version,
                        timeout,
                    )?));
                }
                _ => warn!("Skipping schema variant {variant}: no instance URL or access token"),
            },
            SchemaVariant::File(dir) => {
                fetchers.push(Arc::new(FileSchemaFetcher::new(dir.clone())));
            }
        }
    }

    if let Some(dir) = &opts.fixtures_dir {
        if !variants.iter().any(|v| matches!(v, SchemaVariant::File(_))) {
            fetchers.push(Arc::new(FileSchemaFetcher::new(dir.clone())));
        }
    }

    if fetchers.is_empty() {
        anyhow::bail!("No usable schema variants in {variants:?}");
    }

    let resolver = SchemaResolver::new(fetchers);
    info!("Schema variants: {}", resolver.variants().join(", "));
    Ok(resolver)
}
