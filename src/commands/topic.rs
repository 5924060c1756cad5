//! Topic lookup handler.

use pubsub_stream::classify_status;
use pubsub_types::{validate_topic, TopicInfo};

use crate::{connect_upstream, PubSubOpts};

/// Look `topic` up and return what the API reports about it.
pub async fn run(opts: &PubSubOpts, topic: &str) -> anyhow::Result<TopicInfo> {
    validate_topic(topic)?;
    let upstream = connect_upstream(opts).await?;
    let info = upstream
        .transport
        .topic_info(topic)
        .await
        .map_err(|status| classify_status(topic, status, true))?;
    Ok(info)
}

/// Render topic details as pretty JSON.
pub fn to_json(info: &TopicInfo) -> serde_json::Value {
    serde_json::json!({
        "topic_name": info.topic_name,
        "tenant_guid": info.tenant_guid,
        "can_publish": info.can_publish,
        "can_subscribe": info.can_subscribe,
        "schema_id": info.schema_id,
    })
}
