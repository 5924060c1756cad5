//! Event schema retrieval over the REST API.
//!
//! `GET {instance_url}/services/data/v{version}/event/eventSchema/{schema_id}?payloadFormat=COMPACT`
//!
//! Some API versions wrap the Avro schema under a `"schema"` key; both shapes
//! are accepted.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::fetcher::SchemaFetcher;

/// API versions tried by default, newest first.
pub const DEFAULT_API_VERSIONS: &[&str] = &["64.0", "61.0", "59.0", "57.0"];

/// Fetches a schema from one REST API version.
pub struct RestSchemaFetcher {
    client: Client,
    instance_url: String,
    access_token: String,
    api_version: String,
}

impl RestSchemaFetcher {
    pub fn new(
        instance_url: &str,
        access_token: &str,
        api_version: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, instance_url, access_token, api_version))
    }

    /// Share one HTTP client across several API versions.
    pub fn with_client(
        client: Client,
        instance_url: &str,
        access_token: &str,
        api_version: &str,
    ) -> Self {
        Self {
            client,
            instance_url: instance_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            api_version: api_version.trim_start_matches('v').to_string(),
        }
    }

    pub fn schema_url(&self, schema_id: &str) -> String {
        format!(
            "{}/services/data/v{}/event/eventSchema/{}?payloadFormat=COMPACT",
            self.instance_url, self.api_version, schema_id
        )
    }
}

#[async_trait]
impl SchemaFetcher for RestSchemaFetcher {
    fn variant(&self) -> String {
        format!("rest v{}", self.api_version)
    }

    async fn fetch(&self, schema_id: &str) -> anyhow::Result<String> {
        let url = self.schema_url(schema_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to fetch schema from '{url}': {e}"))?;

        let status = response.status();
        tracing::info!("Avro schema GET {url} -> {status}");
        if !status.is_success() {
            anyhow::bail!("Schema endpoint returned status {status}: {url}");
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read schema response from '{url}': {e}"))?;

        let schema = normalize_schema_document(body)
            .map_err(|e| anyhow::anyhow!("Unexpected schema shape from '{url}': {e}"))?;
        Ok(schema.to_string())
    }
}

/// Unwrap `{"schema": {...}}` responses and require a JSON object.
pub fn normalize_schema_document(body: serde_json::Value) -> anyhow::Result<serde_json::Value> {
    let schema = match body {
        serde_json::Value::Object(mut map) => match map.remove("schema") {
            Some(inner) => inner,
            None => serde_json::Value::Object(map),
        },
        other => other,
    };

    if !schema.is_object() {
        anyhow::bail!("expected a JSON object, got {schema}");
    }
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_url() {
        let fetcher = RestSchemaFetcher::with_client(
            Client::new(),
            "https://example.my.salesforce.com/",
            "token",
            "v64.0",
        );
        assert_eq!(
            fetcher.schema_url("abc123"),
            "https://example.my.salesforce.com/services/data/v64.0/event/eventSchema/abc123?payloadFormat=COMPACT"
        );
        assert_eq!(fetcher.variant(), "rest v64.0");
    }

    #[test]
    fn test_normalize_unwrapped_schema() {
        let doc = json!({"type": "record", "name": "Foo", "fields": []});
        assert_eq!(normalize_schema_document(doc.clone()).unwrap(), doc);
    }

    #[test]
    fn test_normalize_wrapped_schema() {
        let inner = json!({"type": "record", "name": "Foo", "fields": []});
        let doc = json!({"schema": inner.clone(), "uuid": "abc"});
        assert_eq!(normalize_schema_document(doc).unwrap(), inner);
    }

    #[test]
    fn test_normalize_rejects_non_object() {
        assert!(normalize_schema_document(json!(["a"])).is_err());
        assert!(normalize_schema_document(json!({"schema": "string"})).is_err());
    }
}
