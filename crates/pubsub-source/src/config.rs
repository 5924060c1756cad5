//! Command-line configuration for batch and continuous collection.

use clap::Parser;
use event_schema::SchemaVariant;
use std::time::Duration;

use crate::collector::BatchConfig;
use crate::continuous::ContinuousConfig;
use crate::duration::{parse_duration, parse_nonzero_duration};

/// Configuration for Pub/Sub event collection.
#[derive(Debug, Clone, Parser)]
pub struct Config {
    /// Topics to poll, e.g. /event/Order_Event__e (comma-separated or repeated)
    #[clap(
        long = "topic",
        env = "SF_TOPIC_NAMES",
        value_delimiter = ',',
        required = true
    )]
    pub topics: Vec<String>,
    /// Maximum number of decoded events to emit per topic per run
    #[clap(long, default_value_t = 100)]
    pub max_events: usize,
    /// Maximum time to wait for events per topic (e.g. "60s", "2m")
    #[clap(long, default_value = "60s", value_parser = parse_duration)]
    pub max_wait: Duration,
    /// Number of events requested per FetchRequest. The server never delivers
    /// more than this many events in one response.
    #[clap(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..))]
    pub batch_size: u32,
    /// Schema retrieval variants, tried in order: "grpc", an API version such
    /// as "64.0", or "file:<dir>"
    #[clap(long, value_delimiter = ',', default_value = "grpc,64.0,61.0,59.0,57.0")]
    pub schema_versions: Vec<SchemaVariant>,
    /// Timeout for a single schema retrieval attempt
    #[clap(long, default_value = "30s", value_parser = parse_duration)]
    pub schema_timeout: Duration,
    /// Interval between follow-up credit requests in continuous mode
    #[clap(long, default_value = "30s", value_parser = parse_nonzero_duration)]
    pub fetch_interval: Duration,
    /// How long to wait for in-flight responses after closing a subscription
    #[clap(long, default_value = "5s", value_parser = parse_duration)]
    pub drain_timeout: Duration,
    /// Skip the topic lookup performed before subscribing
    #[clap(long)]
    pub skip_topic_check: bool,
    /// Fail instead of restarting from the earliest retained event when the
    /// stored replay token is rejected
    #[clap(long)]
    pub no_token_fallback: bool,
}

impl Config {
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            batch_size: self.batch_size as usize,
            validate_topic: !self.skip_topic_check,
            drain_timeout: self.drain_timeout,
            fallback_on_invalid_token: !self.no_token_fallback,
        }
    }

    pub fn continuous_config(&self) -> ContinuousConfig {
        ContinuousConfig {
            fetch_interval: self.fetch_interval,
            batch_size: self.batch_size as usize,
            drain_timeout: self.drain_timeout,
            fallback_on_invalid_token: !self.no_token_fallback,
        }
    }
}
