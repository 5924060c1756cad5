//! gRPC client for the Pub/Sub API.

use async_trait::async_trait;
use event_schema::SchemaFetcher;
use futures::StreamExt;
use pubsub_types::{FetchResponse, TopicInfo};
use std::time::Duration;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::MetadataValue;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tonic::Code;
use tracing::{debug, info};

use crate::error::{SessionError, StatusDetail};
use crate::proto;
use crate::transport::{RequestStream, ResponseStream, SubscribeTransport};

pub const DEFAULT_ENDPOINT: &str = "https://api.pubsub.salesforce.com:7443";

/// Per-call authentication metadata.
#[derive(Clone)]
pub struct Credentials {
    pub access_token: String,
    pub instance_url: String,
    pub tenant_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("instance_url", &self.instance_url)
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

/// Pub/Sub API client over one HTTP/2 channel.
#[derive(Clone)]
pub struct PubSubTransport {
    channel: Channel,
    endpoint: String,
    credentials: Credentials,
}

impl PubSubTransport {
    pub async fn connect(endpoint: &str, credentials: Credentials) -> Result<Self, SessionError> {
        let connect_error = |message: String| SessionError::Connect {
            target: endpoint.to_string(),
            message,
        };

        let mut builder = Endpoint::from_shared(endpoint.to_string())
            .map_err(|e| connect_error(format!("Invalid endpoint: {e}")))?
            .connect_timeout(Duration::from_secs(30))
            .http2_keep_alive_interval(Duration::from_secs(30))
            .keep_alive_while_idle(true);

        if endpoint.starts_with("https://") {
            builder = builder
                .tls_config(ClientTlsConfig::new().with_webpki_roots())
                .map_err(|e| connect_error(format!("TLS configuration failed: {e}")))?;
        }

        let channel = builder
            .connect()
            .await
            .map_err(|e| connect_error(format!("{e}")))?;

        info!("Connected to Pub/Sub API at {endpoint}");
        Ok(Self {
            channel,
            endpoint: endpoint.to_string(),
            credentials,
        })
    }

    fn authorize<T>(&self, message: T) -> Result<tonic::Request<T>, StatusDetail> {
        let mut request = tonic::Request::new(message);
        let metadata = request.metadata_mut();
        for (key, value) in [
            ("accesstoken", &self.credentials.access_token),
            ("instanceurl", &self.credentials.instance_url),
            ("tenantid", &self.credentials.tenant_id),
        ] {
            let value = MetadataValue::try_from(value.as_str()).map_err(|_| {
                StatusDetail::new(
                    Code::InvalidArgument,
                    format!("{key} contains characters not allowed in call metadata"),
                )
            })?;
            metadata.insert(key, value);
        }
        Ok(request)
    }

    async fn ready(&self) -> Result<Grpc<Channel>, StatusDetail> {
        let mut grpc = Grpc::new(self.channel.clone());
        grpc.ready().await.map_err(|e| {
            StatusDetail::new(Code::Unavailable, format!("Service was not ready: {e}"))
        })?;
        Ok(grpc)
    }

    /// Fetch a schema definition with `GetSchema`.
    pub async fn get_schema(&self, schema_id: &str) -> Result<String, StatusDetail> {
        let request = self.authorize(proto::SchemaRequest {
            schema_id: schema_id.to_string(),
        })?;
        let mut grpc = self.ready().await?;
        let codec = ProstCodec::<proto::SchemaRequest, proto::SchemaInfo>::default();
        let response = grpc
            .unary(request, PathAndQuery::from_static(proto::GET_SCHEMA_PATH), codec)
            .await
            .map_err(StatusDetail::from)?;

        let info = response.into_inner();
        debug!("GetSchema {schema_id} -> rpc {}", info.rpc_id);
        Ok(info.schema_json)
    }
}

#[async_trait]
impl SubscribeTransport for PubSubTransport {
    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }

    async fn subscribe(&self, requests: RequestStream) -> Result<ResponseStream, StatusDetail> {
        let outbound = requests.map(|request| proto::FetchRequest::from(&request));
        let request = self.authorize(outbound)?;
        let mut grpc = self.ready().await?;
        let codec = ProstCodec::<proto::FetchRequest, proto::FetchResponse>::default();

        let response = grpc
            .streaming(request, PathAndQuery::from_static(proto::SUBSCRIBE_PATH), codec)
            .await
            .map_err(StatusDetail::from)?;

        let inbound = response.into_inner().map(|item| {
            item.map(FetchResponse::from)
                .map_err(StatusDetail::from)
        });
        Ok(inbound.boxed())
    }

    async fn topic_info(&self, topic: &str) -> Result<TopicInfo, StatusDetail> {
        let request = self.authorize(proto::TopicRequest {
            topic_name: topic.to_string(),
        })?;
        let mut grpc = self.ready().await?;
        let codec = ProstCodec::<proto::TopicRequest, proto::TopicInfo>::default();
        let response = grpc
            .unary(request, PathAndQuery::from_static(proto::GET_TOPIC_PATH), codec)
            .await
            .map_err(StatusDetail::from)?;

        Ok(TopicInfo::from(response.into_inner()))
    }
}

/// The `grpc` schema variant: `GetSchema` on the Pub/Sub API.
pub struct GrpcSchemaFetcher {
    transport: PubSubTransport,
}

impl GrpcSchemaFetcher {
    pub fn new(transport: PubSubTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl SchemaFetcher for GrpcSchemaFetcher {
    fn variant(&self) -> String {
        "grpc".to_string()
    }

    async fn fetch(&self, schema_id: &str) -> anyhow::Result<String> {
        self.transport
            .get_schema(schema_id)
            .await
            .map_err(|status| anyhow::anyhow!("GetSchema failed: {status}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_token() {
        let credentials = Credentials {
            access_token: "00Dxx!secret".to_string(),
            instance_url: "https://example.my.salesforce.com".to_string(),
            tenant_id: "00Dxx".to_string(),
        };
        let printed = format!("{credentials:?}");
        assert!(!printed.contains("secret"));
        assert!(printed.contains("example.my.salesforce.com"));
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_endpoint() {
        let credentials = Credentials {
            access_token: String::new(),
            instance_url: String::new(),
            tenant_id: String::new(),
        };
        let err = PubSubTransport::connect("not a uri", credentials)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SessionError::Connect { .. }));
    }
}
