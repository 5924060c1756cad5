use apache_avro::Schema;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{SchemaAttempt, SchemaUnavailableError};
use crate::fetcher::SchemaFetcher;

/// A resolved, decode-ready schema.
#[derive(Debug)]
pub struct SchemaHandle {
    pub schema_id: String,
    /// Variant that produced this schema
    pub variant: String,
    /// Schema definition document as retrieved
    pub definition: String,
    /// Parsed Avro schema
    pub schema: Schema,
}

/// Resolves schema ids to parsed schemas.
///
/// Fetchers are tried in order and the first one that returns a parseable
/// schema wins. Successful resolutions are cached for the lifetime of the
/// resolver and never invalidated; failures are not cached, so a later event
/// with the same schema id retries every variant.
pub struct SchemaResolver {
    fetchers: Vec<Arc<dyn SchemaFetcher>>,
    cache: RwLock<HashMap<String, Arc<SchemaHandle>>>,
}

impl SchemaResolver {
    pub fn new(fetchers: Vec<Arc<dyn SchemaFetcher>>) -> Self {
        Self {
            fetchers,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Names of the configured variants, in fallback order.
    pub fn variants(&self) -> Vec<String> {
        self.fetchers.iter().map(|f| f.variant()).collect()
    }

    /// Cached handle for `schema_id`, without fetching.
    pub async fn cached(&self, schema_id: &str) -> Option<Arc<SchemaHandle>> {
        self.cache.read().await.get(schema_id).cloned()
    }

    pub async fn cache_len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Resolve a schema id, fetching it on a cache miss.
    pub async fn resolve(&self, schema_id: &str) -> Result<Arc<SchemaHandle>, SchemaUnavailableError> {
        if let Some(handle) = self.cache.read().await.get(schema_id) {
            return Ok(Arc::clone(handle));
        }

        let mut attempts = Vec::with_capacity(self.fetchers.len());

        for fetcher in &self.fetchers {
            let variant = fetcher.variant();
            let definition = match fetcher.fetch(schema_id).await {
                Ok(definition) => definition,
                Err(e) => {
                    warn!("Schema fetch attempt for {schema_id} failed on {variant}: {e:#}");
                    attempts.push(SchemaAttempt {
                        variant,
                        reason: format!("{e:#}"),
                    });
                    continue;
                }
            };

            let schema = match Schema::parse_str(&definition) {
                Ok(schema) => schema,
                Err(e) => {
                    warn!("Schema {schema_id} from {variant} is not valid Avro: {e}");
                    attempts.push(SchemaAttempt {
                        variant,
                        reason: format!("invalid Avro schema: {e}"),
                    });
                    continue;
                }
            };

            info!("Resolved schema {schema_id} via {variant}");
            let handle = Arc::new(SchemaHandle {
                schema_id: schema_id.to_string(),
                variant,
                definition,
                schema,
            });

            // a concurrent resolve may have won the race; keep the first handle
            let mut cache = self.cache.write().await;
            let cached = cache.entry(schema_id.to_string()).or_insert(handle);
            return Ok(Arc::clone(cached));
        }

        Err(SchemaUnavailableError {
            schema_id: schema_id.to_string(),
            attempts,
        })
    }
}
